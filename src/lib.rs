//! Shipment tracking service.
//!
//! Serves courier tracking histories that can only be read by driving a
//! third-party website, behind a shared HTTP endpoint.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /track ──▶ http ──▶ tracking::TrackingService
//!                                │
//!                 ┌──────────────┼───────────────────────────────┐
//!                 ▼              ▼               ▼               ▼
//!          resilience::    resilience::      cache::        page + extraction
//!          admission       circuit_breaker   TrackingCache  (session per lookup,
//!          (slots)         (fail fast)       (redis/memory)  courier strategy)
//! ```
//!
//! Cross-cutting: `config` (TOML), `observability` (tracing + metrics),
//! `lifecycle` (startup, signals, shutdown).

// Core
pub mod cache;
pub mod extraction;
pub mod page;
pub mod resilience;
pub mod tracking;

// Surfaces
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::TrackerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use tracking::{TrackingError, TrackingEvent, TrackingRequest, TrackingService};
