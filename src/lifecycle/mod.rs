//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → page provider → cache → service → bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain in-flight lookups → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{build_page_provider, build_service, StartupError};
