//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TrackerConfig (validated, immutable)
//!     → consumed once at startup to build the service
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; thresholds and limits are static
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_from_str, load_or_default, ConfigError};
pub use schema::{
    AdmissionConfig, CacheConfig, CircuitBreakerConfig, InstanceConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, PageConfig, SiteConfig, TimeoutConfig, TrackerConfig,
};
pub use validation::{validate_config, ValidationError};
