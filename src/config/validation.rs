//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TrackerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::TrackerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &TrackerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.step_secs == 0 {
        errors.push(ValidationError::new("timeouts.step_secs", "must be > 0"));
    }

    if config.admission.max_concurrent == 0 {
        errors.push(ValidationError::new("admission.max_concurrent", "must be > 0"));
    }

    if config.circuit_breaker.threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.threshold", "must be > 0"));
    }
    if config.circuit_breaker.cooldown_secs == 0 {
        errors.push(ValidationError::new("circuit_breaker.cooldown_secs", "must be > 0"));
    }

    if config.cache.enabled {
        if config.cache.ttl_secs == 0 {
            errors.push(ValidationError::new("cache.ttl_secs", "must be > 0 when caching is enabled"));
        }
        if config.cache.operation.trim().is_empty() {
            errors.push(ValidationError::new("cache.operation", "must not be empty"));
        }
        if config.cache.timeout_ms == 0 {
            errors.push(ValidationError::new("cache.timeout_ms", "must be > 0 when caching is enabled"));
        }
        if let Some(url) = &config.cache.redis_url {
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                errors.push(ValidationError::new(
                    "cache.redis_url",
                    format!("'{}' must use the redis:// or rediss:// scheme", url),
                ));
            }
        }
    }

    if url::Url::parse(&config.site.base_url).is_err() {
        errors.push(ValidationError::new(
            "site.base_url",
            format!("'{}' is not a valid URL", config.site.base_url),
        ));
    }
    if config.site.resi_param.is_empty() {
        errors.push(ValidationError::new("site.resi_param", "must not be empty"));
    }
    if config.site.results_table.is_empty() {
        errors.push(ValidationError::new("site.results_table", "must not be empty"));
    }

    if config.page.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        errors.push(ValidationError::new("page.user_agents", "at least one user agent is required"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
