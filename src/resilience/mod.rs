//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Lookup request:
//!     → admission.rs (take a slot or reject immediately)
//!     → circuit_breaker.rs (fail fast while the source is considered down)
//!     → scrape, then record the outcome back into the breaker
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every scrape step has a deadline
//! - No retries here; retrying is the caller's decision
//! - Only scrape outcomes feed the breaker

pub mod admission;
pub mod circuit_breaker;

pub use admission::{AdmissionController, AdmissionPermit, AdmissionSnapshot};
pub use circuit_breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
