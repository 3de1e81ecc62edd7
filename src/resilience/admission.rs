//! Admission control for the scrape path.
//!
//! # Responsibilities
//! - Bound the number of lookups in flight
//! - Reject immediately when full (no queueing)
//! - Release the slot on every exit path via an RAII permit

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::AdmissionConfig;
use crate::observability::metrics;

/// Point-in-time view of the gate, for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionSnapshot {
    pub in_flight: usize,
    pub max_concurrent: usize,
}

/// Bounded-concurrency gate.
#[derive(Debug)]
pub struct AdmissionController {
    in_flight: AtomicUsize,
    max_concurrent: usize,
    retry_after: Duration,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize, retry_after: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_concurrent,
            retry_after,
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.max_concurrent, Duration::from_secs(config.retry_after_secs))
    }

    /// Try to take a slot. Returns `None` without side effects when full.
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= self.max_concurrent {
                return None;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        metrics::record_in_flight(current + 1);
        Some(AdmissionPermit {
            controller: Arc::clone(self),
        })
    }

    fn release(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "admission slot released twice");
        metrics::record_in_flight(previous.saturating_sub(1));
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Advisory delay sent back with a rejection.
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    pub fn is_saturated(&self) -> bool {
        self.in_flight() >= self.max_concurrent
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            in_flight: self.in_flight(),
            max_concurrent: self.max_concurrent,
        }
    }
}

/// One admission slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    controller: Arc<AdmissionController>,
}

impl AdmissionPermit {
    /// Release the slot now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.controller.release();
    }
}
