//! Error taxonomy for tracking lookups.

use std::time::Duration;

use thiserror::Error;

use crate::page::SessionError;
use crate::resilience::circuit_breaker::round_up_secs;

fn retry_secs(retry_after: &Duration) -> u64 {
    round_up_secs(*retry_after)
}

/// Errors that can end a tracking lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackingError {
    /// A required parameter was missing or blank.
    #[error("missing required parameter: {0}")]
    Validation(&'static str),

    /// The courier identifier cannot be passed to the lookup form.
    #[error("unsupported courier identifier: {0:?}")]
    InvalidCourier(String),

    /// The admission gate is full.
    #[error("too many lookups in progress, retry in {}s", retry_secs(.retry_after))]
    CapacityExceeded { retry_after: Duration },

    /// The circuit breaker is open.
    #[error("tracking source temporarily unavailable, retry in {}s", retry_secs(.retry_after))]
    CircuitOpen { retry_after: Duration },

    /// Navigation to the tracking page failed.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// An expected element did not appear in time.
    #[error("element not available: {0}")]
    SelectorTimeout(String),

    /// The whole extraction exceeded its deadline.
    #[error("extraction timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// No page session could be obtained.
    #[error("page session unavailable: {0}")]
    Session(String),
}

impl TrackingError {
    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingError::Validation(_) | TrackingError::InvalidCourier(_) => "validation_error",
            TrackingError::CapacityExceeded { .. } => "capacity_exceeded",
            TrackingError::CircuitOpen { .. } => "circuit_open",
            TrackingError::Navigation(_) => "navigation_error",
            TrackingError::SelectorTimeout(_) => "selector_timeout",
            TrackingError::Timeout(_) => "timeout",
            TrackingError::Session(_) => "session_error",
        }
    }

    /// Whether this error is a scrape-path failure the breaker must see.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(
            self,
            TrackingError::Navigation(_)
                | TrackingError::SelectorTimeout(_)
                | TrackingError::Timeout(_)
                | TrackingError::Session(_)
        )
    }

    /// Advisory retry delay for rejections.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TrackingError::CapacityExceeded { retry_after }
            | TrackingError::CircuitOpen { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<SessionError> for TrackingError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Navigation { .. } => TrackingError::Navigation(err.to_string()),
            SessionError::ElementNotFound(_) | SessionError::Timeout { .. } => {
                TrackingError::SelectorTimeout(err.to_string())
            }
            SessionError::Unavailable(reason) => TrackingError::Session(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_scrape_errors_count_against_breaker() {
        assert!(!TrackingError::Validation("resi").counts_against_breaker());
        assert!(!TrackingError::InvalidCourier("x'".into()).counts_against_breaker());
        assert!(!TrackingError::CapacityExceeded {
            retry_after: Duration::from_secs(5)
        }
        .counts_against_breaker());
        assert!(!TrackingError::CircuitOpen {
            retry_after: Duration::from_secs(5)
        }
        .counts_against_breaker());

        assert!(TrackingError::Navigation("dns".into()).counts_against_breaker());
        assert!(TrackingError::SelectorTimeout("#table".into()).counts_against_breaker());
        assert!(TrackingError::Timeout(Duration::from_secs(60)).counts_against_breaker());
        assert!(TrackingError::Session("no browser".into()).counts_against_breaker());
    }

    #[test]
    fn session_errors_map_to_kinds() {
        let nav: TrackingError = SessionError::Navigation {
            url: "https://example.test".into(),
            reason: "refused".into(),
        }
        .into();
        assert_eq!(nav.kind(), "navigation_error");

        let timeout: TrackingError = SessionError::Timeout {
            selector: "#collapseTwo table".into(),
            after: Duration::from_secs(30),
        }
        .into();
        assert_eq!(timeout.kind(), "selector_timeout");

        let missing: TrackingError = SessionError::ElementNotFound("#cekresi".into()).into();
        assert_eq!(missing.kind(), "selector_timeout");
    }

    #[test]
    fn circuit_open_message_rounds_up() {
        let err = TrackingError::CircuitOpen {
            retry_after: Duration::from_millis(2_500),
        };
        assert_eq!(err.to_string(), "tracking source temporarily unavailable, retry in 3s");
        assert_eq!(err.retry_after(), Some(Duration::from_millis(2_500)));
    }
}
