//! Route handlers.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::http::response::{error_response, TrackBody};
use crate::http::server::AppState;
use crate::tracking::TrackingRequest;

/// Query string of `/track`. Both fields are optional here so a missing
/// parameter produces our own 400 body instead of axum's rejection.
#[derive(Debug, Default, Deserialize)]
pub struct TrackQuery {
    pub resi: Option<String>,
    pub courier: Option<String>,
}

/// `GET /track?resi=&courier=`
pub async fn track(State(state): State<AppState>, Query(query): Query<TrackQuery>) -> Response {
    let start = Instant::now();
    let instance = state.service.instance_id();

    let request = match TrackingRequest::new(
        query.resi.unwrap_or_default(),
        query.courier.unwrap_or_default(),
    ) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected track request");
            return error_response(&e, instance);
        }
    };

    match state.service.track(&request).await {
        Ok(outcome) => {
            let body = TrackBody {
                resi: request.resi,
                courier: request.courier,
                result: outcome.events,
                processing_time: start.elapsed().as_millis() as u64,
                cached: outcome.cached,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(&e, instance),
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Response {
    let snapshot = state.service.health();
    let status = if snapshot.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(snapshot)).into_response()
}
