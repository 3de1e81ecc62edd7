//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tracker.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the tracking service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Concurrency gate for the scrape path.
    pub admission: AdmissionConfig,

    /// Circuit breaker around the scrape path.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Result cache settings.
    pub cache: CacheConfig,

    /// Tracking website layout.
    pub site: SiteConfig,

    /// Browser page settings.
    pub page: PageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Instance identity.
    pub instance: InstanceConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration for the scrape path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a whole extraction in seconds.
    pub request_secs: u64,

    /// Deadline for a single navigation or wait-for-element step in seconds.
    pub step_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            step_secs: 30,
        }
    }
}

/// Admission gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of lookups in flight at once.
    pub max_concurrent: usize,

    /// Advisory retry delay sent with capacity rejections, in seconds.
    pub retry_after_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            retry_after_secs: 5,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure count at which the breaker opens.
    pub threshold: u32,

    /// Time the breaker stays open after the last failure, in seconds.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            cooldown_secs: 60,
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable result caching.
    pub enabled: bool,

    /// Lifetime of a cached result in seconds.
    pub ttl_secs: u64,

    /// Redis URL. When absent an in-process store is used.
    pub redis_url: Option<String>,

    /// Operation name used as the key namespace.
    pub operation: String,

    /// Deadline for a single cache read or write in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            redis_url: None,
            operation: "track".to_string(),
            timeout_ms: 500,
        }
    }
}

/// Layout of the tracking website.
///
/// `courier_option` may contain a `{courier}` placeholder that is replaced
/// with the carrier code before use.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Lookup page URL.
    pub base_url: String,

    /// Query parameter carrying the tracking number.
    pub resi_param: String,

    /// Button that opens the lookup form.
    pub form_trigger: String,

    /// Carrier option inside the lookup form.
    pub courier_option: String,

    /// Toggle that expands the results panel.
    pub results_toggle: String,

    /// Results table.
    pub results_table: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cekresi.com/".to_string(),
            resi_param: "noresi".to_string(),
            form_trigger: "#cekresi".to_string(),
            courier_option: "a[onclick*=\"'{courier}'\"]".to_string(),
            results_toggle: "a[href=\"#collapseTwo\"]".to_string(),
            results_table: "#collapseTwo table".to_string(),
        }
    }
}

/// Browser page configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PageConfig {
    /// User agents to pick from for each new session.
    pub user_agents: Vec<String>,

    /// Run the browser without a window.
    pub headless: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            user_agents: crate::page::user_agent::DEFAULT_USER_AGENTS
                .iter()
                .map(|ua| ua.to_string())
                .collect(),
            headless: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Instance identity reported in error bodies and health checks.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct InstanceConfig {
    /// Stable identifier. A random one is generated when absent.
    pub id: Option<String>,
}
