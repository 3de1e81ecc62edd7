//! Result cache for successful lookups.
//!
//! # Data Flow
//! ```text
//! TrackingRequest
//!     → CacheKey ("{operation}:{courier}:{resi}")
//!     → CacheStore (redis shared across instances, or in-process memory)
//!     → JSON-encoded Vec<TrackingEvent>
//! ```
//!
//! The cache is an optimization only: any backend error or a backend that
//! does not answer within the operation timeout is logged and treated as a
//! miss, and failed lookups are never written.

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::tracking::{TrackingEvent, TrackingRequest};

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cached value is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cache backend did not answer within {0:?}")]
    Timeout(Duration),
}

/// Deadline for a single store call when none is configured.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(500);

/// Key-value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Cache key for one lookup. Components are form-url-encoded so a resi
/// containing `:` cannot collide with another courier's key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str, courier: &str, resi: &str) -> Self {
        let encode =
            |part: &str| url::form_urlencoded::byte_serialize(part.as_bytes()).collect::<String>();
        Self(format!(
            "{}:{}:{}",
            encode(operation),
            encode(courier),
            encode(resi)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache front used by the tracking service.
#[derive(Clone)]
pub struct TrackingCache {
    store: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
    operation: String,
    timeout: Duration,
}

impl TrackingCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, operation: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            ttl,
            operation: operation.into(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Bound every store call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A cache that always misses and never stores.
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl: Duration::ZERO,
            operation: String::new(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Build the cache described by `config`.
    ///
    /// With a redis URL the store is shared across instances; a connection
    /// failure at startup degrades to a disabled cache rather than failing boot.
    pub async fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            tracing::info!("Result cache disabled");
            return Self::disabled();
        }

        let ttl = Duration::from_secs(config.ttl_secs);
        let timeout = Duration::from_millis(config.timeout_ms);
        let store: Arc<dyn CacheStore> = match &config.redis_url {
            Some(url) => match with_deadline(timeout, RedisStore::connect(url)).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, result cache disabled");
                    return Self::disabled();
                }
            },
            None => Arc::new(MemoryStore::new()),
        };

        tracing::info!(
            backend = store.backend(),
            ttl_secs = config.ttl_secs,
            timeout_ms = config.timeout_ms,
            "Result cache enabled"
        );
        Self::new(store, ttl, config.operation.clone()).with_timeout(timeout)
    }

    pub fn key_for(&self, request: &TrackingRequest) -> CacheKey {
        CacheKey::new(&self.operation, &request.courier_key(), &request.resi)
    }

    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("disabled", |store| store.backend())
    }

    /// Look up a previous result. Errors and undecodable entries count as a miss.
    pub async fn get(&self, request: &TrackingRequest) -> Option<Vec<TrackingEvent>> {
        let store = self.store.as_ref()?;
        let key = self.key_for(request);

        match with_deadline(self.timeout, read_events(store.as_ref(), &key)).await {
            Ok(Some(events)) => {
                metrics::record_cache("hit");
                tracing::debug!(key = %key, "Cache hit");
                Some(events)
            }
            Ok(None) => {
                metrics::record_cache("miss");
                None
            }
            Err(e) => {
                metrics::record_cache("error");
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a successful result. Errors are logged and dropped.
    pub async fn put(&self, request: &TrackingRequest, events: &[TrackingEvent]) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let key = self.key_for(request);

        let value = match serde_json::to_string(events) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        let write = store.set_ex(key.as_str(), &value, self.ttl);
        if let Err(e) = with_deadline(self.timeout, write).await {
            metrics::record_cache("error");
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

async fn with_deadline<T>(
    timeout: Duration,
    call: impl std::future::Future<Output = Result<T, CacheError>>,
) -> Result<T, CacheError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(timeout)),
    }
}

async fn read_events(
    store: &dyn CacheStore,
    key: &CacheKey,
) -> Result<Option<Vec<TrackingEvent>>, CacheError> {
    match store.get(key.as_str()).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

impl std::fmt::Debug for TrackingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingCache")
            .field("backend", &self.backend())
            .field("ttl", &self.ttl)
            .field("operation", &self.operation)
            .field("timeout", &self.timeout)
            .finish()
    }
}
