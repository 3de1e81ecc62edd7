//! Courier-specific extraction strategies.
//!
//! # Data Flow
//! ```text
//! TrackingRequest
//!     → ExtractionRegistry::resolve(courier)   (unknown ⇒ default strategy)
//!     → ExtractionStrategy::check(request)      (bad identifier ⇒ 400)
//!     → ExtractionStrategy::extract(request, session)
//!         goto lookup URL → open form → select courier → expand results
//!         → read table rows
//!     → Vec<TrackingEvent> in page order
//! ```

pub mod registry;
pub mod site;
pub mod strategy;

use async_trait::async_trait;

use crate::page::PageSession;
use crate::tracking::{TrackingError, TrackingEvent, TrackingRequest};

pub use registry::ExtractionRegistry;
pub use site::SiteProfile;
pub use strategy::{CourierFormStrategy, GenericFormStrategy};

/// Drives a page session to the tracking history of one shipment.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// Reject requests this strategy cannot drive, before any page is opened.
    fn check(&self, _request: &TrackingRequest) -> Result<(), TrackingError> {
        Ok(())
    }

    /// Extract the rendered history. Rows come back in page order.
    async fn extract(
        &self,
        request: &TrackingRequest,
        session: &mut dyn PageSession,
    ) -> Result<Vec<TrackingEvent>, TrackingError>;
}
