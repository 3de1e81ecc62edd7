//! Circuit breaker for the scrape path.
//!
//! # States
//! - Closed: lookups allowed
//! - Open: lookups fail fast until the cooldown has elapsed
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Closed: now - last_failure_at >= cooldown, checked lazily on the next evaluation
//! ```
//!
//! # Design Decisions
//! - One breaker per service instance, never shared across processes
//! - No half-open trial request: the first evaluation after the cooldown closes the breaker
//! - A success only decrements the failure count, so recovery from a burst of failures is slow
//! - Every read-then-mutate sequence happens under one lock with no await point inside

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
}

/// Point-in-time view of the breaker, for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub threshold: u32,
    /// Seconds until the breaker closes, zero when closed.
    pub retry_after: u64,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
}

/// Failure-count circuit breaker with timed recovery.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    /// Create a breaker that opens at `threshold` failures and stays open for `cooldown`.
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure_at: None,
            }),
            threshold: threshold.max(1),
            cooldown,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.threshold, Duration::from_secs(config.cooldown_secs))
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if lookups must be short-circuited right now.
    pub fn is_open(&self) -> bool {
        self.is_open_at(Instant::now())
    }

    pub fn is_open_at(&self, now: Instant) -> bool {
        self.check_at(now).is_err()
    }

    /// Evaluate the breaker, returning the remaining cooldown when open.
    pub fn check(&self) -> Result<(), Duration> {
        self.check_at(Instant::now())
    }

    pub fn check_at(&self, now: Instant) -> Result<(), Duration> {
        let mut inner = self.lock();
        self.evaluate(&mut inner, now)
    }

    fn evaluate(&self, inner: &mut Inner, now: Instant) -> Result<(), Duration> {
        if inner.state == BreakerState::Closed {
            return Ok(());
        }

        let elapsed = inner
            .last_failure_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or(self.cooldown);

        if elapsed >= self.cooldown {
            inner.state = BreakerState::Closed;
            inner.failure_count = 0;
            metrics::record_breaker(false, 0);
            tracing::info!(cooldown_secs = self.cooldown.as_secs(), "Circuit breaker closed");
            Ok(())
        } else {
            Err(self.cooldown - elapsed)
        }
    }

    /// Record a failed scrape.
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_at = Some(now);

        if inner.state == BreakerState::Closed && inner.failure_count >= self.threshold {
            inner.state = BreakerState::Open;
            tracing::warn!(
                failures = inner.failure_count,
                threshold = self.threshold,
                cooldown_secs = self.cooldown.as_secs(),
                "Circuit breaker opened"
            );
        }
        metrics::record_breaker(inner.state == BreakerState::Open, inner.failure_count);
    }

    /// Record a successful scrape.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_sub(1);
        metrics::record_breaker(inner.state == BreakerState::Open, inner.failure_count);
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> BreakerSnapshot {
        let mut inner = self.lock();
        let retry_after = match self.evaluate(&mut inner, now) {
            Ok(()) => Duration::ZERO,
            Err(remaining) => remaining,
        };
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            threshold: self.threshold,
            retry_after: round_up_secs(retry_after),
        }
    }
}

/// Whole seconds, rounded up so a client never retries too early.
pub fn round_up_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
