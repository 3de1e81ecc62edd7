//! JSON response shaping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::resilience::circuit_breaker::round_up_secs;
use crate::tracking::{TrackingError, TrackingEvent};

/// Body of a successful `/track` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBody {
    pub resi: String,
    pub courier: String,
    pub result: Vec<TrackingEvent>,
    /// Milliseconds spent serving the request.
    pub processing_time: u64,
    pub cached: bool,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    pub instance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// HTTP status for a lookup error.
pub fn status_for(err: &TrackingError) -> StatusCode {
    match err {
        TrackingError::Validation(_) | TrackingError::InvalidCourier(_) => StatusCode::BAD_REQUEST,
        TrackingError::CapacityExceeded { .. } | TrackingError::CircuitOpen { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        TrackingError::Navigation(_)
        | TrackingError::SelectorTimeout(_)
        | TrackingError::Timeout(_)
        | TrackingError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a lookup error. Rejections carry `retryAfter` and a `Retry-After`
/// header; extraction failures carry `details`.
pub fn error_response(err: &TrackingError, instance: &str) -> Response {
    let status = status_for(err);
    let retry_after = err.retry_after().map(round_up_secs);

    let (error, details) = if status == StatusCode::INTERNAL_SERVER_ERROR {
        ("tracking extraction failed".to_string(), Some(err.to_string()))
    } else {
        (err.to_string(), None)
    };

    let body = ErrorBody {
        error,
        kind: err.kind(),
        instance: instance.to_string(),
        retry_after,
        details,
    };

    let mut response = (status, Json(body)).into_response();
    if let Some(secs) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}
