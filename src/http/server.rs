//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router with the tracking handlers
//! - Wire up middleware (tracing, request id, timeout backstop)
//! - Serve on a listener until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;
use crate::tracking::TrackingService;

/// Slack on top of the lookup deadline before the HTTP layer gives up.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TrackingService>,
}

/// HTTP front of the tracking service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(service: Arc<TrackingService>) -> Self {
        let backstop = service.request_timeout() + TIMEOUT_GRACE;
        let router = Self::build_router(AppState { service }, backstop);
        Self { router }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, backstop: Duration) -> Router {
        Router::new()
            .route("/track", get(handlers::track))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(TimeoutLayer::new(backstop))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_span::<Body>))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Router with all layers applied, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
