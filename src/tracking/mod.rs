//! Tracking lookups: request/result types, errors and the orchestrating service.

pub mod error;
pub mod service;
pub mod types;

pub use error::TrackingError;
pub use service::{HealthSnapshot, TrackingService};
pub use types::{TrackingEvent, TrackingOutcome, TrackingRequest};
