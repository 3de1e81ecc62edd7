//! Lookup orchestration.
//!
//! One lookup walks: courier check → admission → breaker → cache → session
//! → extraction (under the request deadline) → breaker/cache bookkeeping
//! → release.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::TrackingCache;
use crate::extraction::ExtractionRegistry;
use crate::observability::metrics;
use crate::page::{PageProvider, SessionGuard};
use crate::resilience::{
    AdmissionController, AdmissionSnapshot, BreakerSnapshot, BreakerState, CircuitBreaker,
};
use crate::tracking::{TrackingError, TrackingEvent, TrackingOutcome, TrackingRequest};

/// Point-in-time view of the service, served by `/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// `ok`, or `degraded` when lookups would currently be rejected.
    pub status: &'static str,
    pub instance: String,
    pub breaker: BreakerSnapshot,
    pub admission: AdmissionSnapshot,
    pub cache_backend: &'static str,
    pub uptime_secs: u64,
}

impl HealthSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }
}

/// Shared state and policy for tracking lookups.
pub struct TrackingService {
    admission: Arc<AdmissionController>,
    breaker: CircuitBreaker,
    cache: TrackingCache,
    registry: ExtractionRegistry,
    pages: Arc<dyn PageProvider>,
    request_timeout: Duration,
    instance_id: String,
    started_at: Instant,
}

impl TrackingService {
    pub fn new(
        admission: AdmissionController,
        breaker: CircuitBreaker,
        cache: TrackingCache,
        registry: ExtractionRegistry,
        pages: Arc<dyn PageProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            admission: Arc::new(admission),
            breaker,
            cache,
            registry,
            pages,
            request_timeout,
            instance_id: uuid::Uuid::new_v4().to_string(),
            started_at: Instant::now(),
        }
    }

    /// Replace the generated instance identity.
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = id.into();
        self
    }

    /// Run one lookup.
    pub async fn track(&self, request: &TrackingRequest) -> Result<TrackingOutcome, TrackingError> {
        let start = Instant::now();
        let result = self.track_inner(request).await;

        let outcome = match &result {
            Ok(outcome) if outcome.cached => "cache_hit",
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_request(outcome, start);
        result
    }

    async fn track_inner(&self, request: &TrackingRequest) -> Result<TrackingOutcome, TrackingError> {
        self.registry.check(request)?;

        let Some(permit) = self.admission.try_acquire() else {
            metrics::record_admission_rejected();
            tracing::warn!(
                courier = %request.courier,
                max_concurrent = self.admission.max_concurrent(),
                "Lookup rejected, at capacity"
            );
            return Err(TrackingError::CapacityExceeded {
                retry_after: self.admission.retry_after(),
            });
        };

        let result = self.admitted(request).await;

        permit.release();
        result
    }

    async fn admitted(&self, request: &TrackingRequest) -> Result<TrackingOutcome, TrackingError> {
        if let Err(remaining) = self.breaker.check() {
            tracing::debug!(
                courier = %request.courier,
                retry_after_ms = remaining.as_millis() as u64,
                "Lookup rejected, breaker open"
            );
            return Err(TrackingError::CircuitOpen {
                retry_after: remaining,
            });
        }

        if let Some(events) = self.cache.get(request).await {
            return Ok(TrackingOutcome {
                events,
                cached: true,
            });
        }

        let courier = request.courier_key();
        let strategy = self.registry.resolve(&courier).name().to_string();
        let result = self.scrape(request).await;

        match &result {
            Ok(events) => {
                self.breaker.record_success();
                metrics::record_extraction(&strategy, "success");
                tracing::info!(
                    courier = %courier,
                    events = events.len(),
                    "Extraction succeeded"
                );
                self.cache.put(request, events).await;
            }
            Err(e) => {
                if e.counts_against_breaker() {
                    self.breaker.record_failure();
                }
                metrics::record_extraction(&strategy, e.kind());
                tracing::warn!(
                    courier = %courier,
                    kind = e.kind(),
                    error = %e,
                    failures = self.breaker.failure_count(),
                    "Extraction failed"
                );
            }
        }

        result.map(|events| TrackingOutcome {
            events,
            cached: false,
        })
    }

    /// Acquire a session, extract under the request deadline and release.
    async fn scrape(&self, request: &TrackingRequest) -> Result<Vec<TrackingEvent>, TrackingError> {
        let mut guard = SessionGuard::acquire(Arc::clone(&self.pages)).await?;

        let extraction = self.registry.extract(request, guard.session());
        match tokio::time::timeout(self.request_timeout, extraction).await {
            Ok(result) => {
                guard.release().await;
                result
            }
            Err(_) => {
                // Closing the page is what stops the abandoned browser work.
                guard.release().await;
                Err(TrackingError::Timeout(self.request_timeout))
            }
        }
    }

    pub fn health(&self) -> HealthSnapshot {
        let breaker = self.breaker.snapshot();
        let admission = self.admission.snapshot();
        let degraded = breaker.state == BreakerState::Open || self.admission.is_saturated();
        HealthSnapshot {
            status: if degraded { "degraded" } else { "ok" },
            instance: self.instance_id.clone(),
            breaker,
            admission,
            cache_backend: self.cache.backend(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn registry(&self) -> &ExtractionRegistry {
        &self.registry
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl std::fmt::Debug for TrackingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingService")
            .field("instance_id", &self.instance_id)
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
