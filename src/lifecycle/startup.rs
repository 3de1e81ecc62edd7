//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every service component from a validated config
//! - Choose the page provider and cache backend
//!
//! # Design Decisions
//! - Fail fast on config errors; degrade on infrastructure errors
//!   (an unreachable redis disables caching, it does not block boot)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::TrackingCache;
use crate::config::TrackerConfig;
use crate::extraction::{ExtractionRegistry, SiteProfile};
use crate::page::PageProvider;
use crate::resilience::{AdmissionController, CircuitBreaker};
use crate::tracking::TrackingService;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid site base URL: {0}")]
    SiteUrl(#[from] url::ParseError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Page provider for this build. With the `chromium` feature a browser is
/// launched; without it, or if launching fails, lookups fail with a session
/// error until the process is restarted.
pub async fn build_page_provider(config: &TrackerConfig) -> Arc<dyn PageProvider> {
    #[cfg(feature = "chromium")]
    {
        match crate::page::chromium::ChromiumPageProvider::launch(&config.page).await {
            Ok(provider) => return Arc::new(provider),
            Err(e) => tracing::error!(error = %e, "Chromium unavailable, lookups will fail"),
        }
    }

    #[cfg(not(feature = "chromium"))]
    tracing::warn!(
        user_agents = config.page.user_agents.len(),
        "Built without a browser engine, lookups will fail"
    );

    Arc::new(crate::page::UnavailablePageProvider)
}

/// Assemble a service from `config` around `pages`.
pub async fn build_service(
    config: &TrackerConfig,
    pages: Arc<dyn PageProvider>,
) -> Result<TrackingService, StartupError> {
    let site = SiteProfile::from_config(&config.site, Duration::from_secs(config.timeouts.step_secs))?;
    let registry = ExtractionRegistry::with_builtin_couriers(&site);
    let cache = TrackingCache::from_config(&config.cache).await;

    let service = TrackingService::new(
        AdmissionController::from_config(&config.admission),
        CircuitBreaker::from_config(&config.circuit_breaker),
        cache,
        registry,
        pages,
        Duration::from_secs(config.timeouts.request_secs),
    );

    let service = match &config.instance.id {
        Some(id) => service.with_instance_id(id.clone()),
        None => service,
    };

    tracing::info!(
        instance = service.instance_id(),
        max_concurrent = config.admission.max_concurrent,
        breaker_threshold = config.circuit_breaker.threshold,
        breaker_cooldown_secs = config.circuit_breaker.cooldown_secs,
        couriers = service.registry().couriers().len(),
        "Tracking service ready"
    );
    Ok(service)
}

/// Bind the HTTP listener.
pub async fn bind(address: &str) -> Result<tokio::net::TcpListener, StartupError> {
    tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::UnavailablePageProvider;

    #[tokio::test]
    async fn builds_service_with_configured_instance() {
        let mut config = TrackerConfig::default();
        config.instance.id = Some("tracker-a".to_string());
        config.cache.enabled = false;

        let service = build_service(&config, Arc::new(UnavailablePageProvider))
            .await
            .unwrap();

        assert_eq!(service.instance_id(), "tracker-a");
        assert!(service.registry().is_registered("jne"));
        assert_eq!(service.health().cache_backend, "disabled");
    }

    #[tokio::test]
    async fn rejects_bad_site_url() {
        let mut config = TrackerConfig::default();
        config.site.base_url = "not a url".to_string();
        let err = build_service(&config, Arc::new(UnavailablePageProvider))
            .await
            .unwrap_err();
        assert!(matches!(err, StartupError::SiteUrl(_)));
    }
}
