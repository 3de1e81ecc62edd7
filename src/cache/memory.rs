//! In-process cache store.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::{CacheError, CacheStore};

/// Minimum spacing between sweeps triggered by writes.
const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// DashMap-backed store.
///
/// Expired entries are dropped when read, and every write sweeps the whole
/// map if the last sweep is older than the purge interval, so keys that are
/// never read again do not accumulate.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Entry>>,
    last_purge: Arc<Mutex<Instant>>,
    purge_interval: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_purge_interval(DEFAULT_PURGE_INTERVAL)
    }

    pub fn with_purge_interval(purge_interval: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            last_purge: Arc::new(Mutex::new(Instant::now())),
            purge_interval,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Purged expired cache entries");
        }
    }

    fn purge_if_due(&self) {
        let now = Instant::now();
        {
            let mut last = self.last_purge.lock().unwrap_or_else(PoisonError::into_inner);
            if now.saturating_duration_since(*last) < self.purge_interval {
                return;
            }
            *last = now;
        }
        self.purge_expired();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let value = match self.inner.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // Expired; the read guard is gone by now.
        self.inner.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.purge_if_due();
        self.inner.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", Duration::from_millis(20)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = MemoryStore::new();
        store.set_ex("short", "v", Duration::ZERO).await.unwrap();
        store.set_ex("long", "v", Duration::from_secs(60)).await.unwrap();
        store.purge_expired();
        assert_eq!(store.len(), 1);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn writes_evict_expired_keys_that_are_never_read() {
        let store = MemoryStore::with_purge_interval(Duration::from_millis(5));
        for i in 0..1000 {
            store
                .set_ex(&format!("track:jne:{i}"), "[]", Duration::from_millis(1))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.set_ex("track:jne:fresh", "[]", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get("track:jne:fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_waits_for_interval() {
        let store = MemoryStore::with_purge_interval(Duration::from_secs(60));
        store.set_ex("old", "v", Duration::ZERO).await.unwrap();
        store.set_ex("new", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.len(), 2);
    }
}
