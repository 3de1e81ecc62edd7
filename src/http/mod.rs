//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware)
//!     → request.rs (request id, trace span)
//!     → handlers.rs (query → TrackingRequest → TrackingService)
//!     → response.rs (result or error → status + JSON)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
