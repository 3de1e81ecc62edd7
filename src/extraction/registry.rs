//! Courier identifier to strategy dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::extraction::{CourierFormStrategy, ExtractionStrategy, GenericFormStrategy, SiteProfile};
use crate::page::PageSession;
use crate::tracking::{TrackingError, TrackingEvent, TrackingRequest};

/// Carriers with a dedicated form entry, as `(alias, form code)`.
const BUILTIN_COURIERS: &[(&str, &str)] = &[
    ("jne", "jne"),
    ("jnt", "jnt"),
    ("j&t", "jnt"),
    ("sicepat", "sicepat"),
    ("pos", "pos"),
    ("tiki", "tiki"),
    ("anteraja", "anteraja"),
    ("ninja", "ninja"),
    ("lion", "lion"),
    ("sap", "sap"),
    ("wahana", "wahana"),
    ("idexpress", "idexpress"),
];

/// Maps courier identifiers to strategies, with an explicit default for
/// identifiers nobody registered.
pub struct ExtractionRegistry {
    strategies: HashMap<String, Arc<dyn ExtractionStrategy>>,
    default: Arc<dyn ExtractionStrategy>,
}

impl ExtractionRegistry {
    pub fn new(default: Arc<dyn ExtractionStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            default,
        }
    }

    /// Registry covering the carriers the lookup site lists, with the
    /// generic form strategy as default.
    pub fn with_builtin_couriers(site: &SiteProfile) -> Self {
        let mut registry = Self::new(Arc::new(GenericFormStrategy::new(site.clone())));
        for (alias, code) in BUILTIN_COURIERS {
            registry.register(*alias, Arc::new(CourierFormStrategy::new(*code, site.clone())));
        }
        registry
    }

    /// Register `strategy` for `courier`. Identifiers are case-insensitive.
    pub fn register(&mut self, courier: &str, strategy: Arc<dyn ExtractionStrategy>) {
        self.strategies
            .insert(courier.trim().to_lowercase(), strategy);
    }

    /// Strategy for `courier`, falling back to the default.
    pub fn resolve(&self, courier: &str) -> &Arc<dyn ExtractionStrategy> {
        self.strategies
            .get(&courier.trim().to_lowercase())
            .unwrap_or(&self.default)
    }

    /// Whether `courier` has a dedicated strategy.
    pub fn is_registered(&self, courier: &str) -> bool {
        self.strategies.contains_key(&courier.trim().to_lowercase())
    }

    /// Registered identifiers, sorted.
    pub fn couriers(&self) -> Vec<&str> {
        let mut couriers: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        couriers.sort_unstable();
        couriers
    }

    /// Validate `request` against the strategy it resolves to.
    pub fn check(&self, request: &TrackingRequest) -> Result<(), TrackingError> {
        self.resolve(&request.courier).check(request)
    }

    /// Dispatch `request` to its strategy.
    pub async fn extract(
        &self,
        request: &TrackingRequest,
        session: &mut dyn PageSession,
    ) -> Result<Vec<TrackingEvent>, TrackingError> {
        let strategy = self.resolve(&request.courier);
        strategy.check(request)?;
        tracing::debug!(
            courier = %request.courier,
            strategy = strategy.name(),
            "Dispatching extraction"
        );
        strategy.extract(request, session).await
    }
}

impl std::fmt::Debug for ExtractionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRegistry")
            .field("couriers", &self.couriers())
            .field("default", &self.default.name())
            .finish()
    }
}
