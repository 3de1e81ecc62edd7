//! Form-driven strategies for the lookup site.

use async_trait::async_trait;

use crate::extraction::{ExtractionStrategy, SiteProfile};
use crate::page::PageSession;
use crate::tracking::{TrackingError, TrackingEvent, TrackingRequest};

/// Longest courier identifier the generic strategy passes to the form.
const MAX_COURIER_CODE_LEN: usize = 32;

/// Whether `code` can be placed in a selector as-is. Form codes are short
/// alphanumeric tokens; `&`, `-`, `_` and `.` cover aliases like `j&t`.
pub fn is_valid_courier_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_COURIER_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '&' | '-' | '_' | '.'))
}

/// Strategy bound to one carrier code on the lookup form.
#[derive(Debug, Clone)]
pub struct CourierFormStrategy {
    code: String,
    site: SiteProfile,
}

impl CourierFormStrategy {
    pub fn new(code: impl Into<String>, site: SiteProfile) -> Self {
        Self {
            code: code.into(),
            site,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for CourierFormStrategy {
    fn name(&self) -> &str {
        &self.code
    }

    async fn extract(
        &self,
        request: &TrackingRequest,
        session: &mut dyn PageSession,
    ) -> Result<Vec<TrackingEvent>, TrackingError> {
        run_form_lookup(&self.site, &self.code, request, session).await
    }
}

/// Fallback for carriers without a dedicated entry. Passes the requested
/// courier identifier straight through to the form.
#[derive(Debug, Clone)]
pub struct GenericFormStrategy {
    site: SiteProfile,
}

impl GenericFormStrategy {
    pub fn new(site: SiteProfile) -> Self {
        Self { site }
    }
}

#[async_trait]
impl ExtractionStrategy for GenericFormStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn check(&self, request: &TrackingRequest) -> Result<(), TrackingError> {
        let code = request.courier_key();
        if is_valid_courier_code(&code) {
            Ok(())
        } else {
            Err(TrackingError::InvalidCourier(request.courier.clone()))
        }
    }

    async fn extract(
        &self,
        request: &TrackingRequest,
        session: &mut dyn PageSession,
    ) -> Result<Vec<TrackingEvent>, TrackingError> {
        self.check(request)?;
        let code = request.courier_key();
        run_form_lookup(&self.site, &code, request, session).await
    }
}

async fn run_form_lookup(
    site: &SiteProfile,
    courier_code: &str,
    request: &TrackingRequest,
    session: &mut dyn PageSession,
) -> Result<Vec<TrackingEvent>, TrackingError> {
    let url = site.lookup_url(&request.resi);
    site.goto(session, &url).await?;

    site.wait_and_click(session, &site.form_trigger).await?;
    site.wait_and_click(session, &site.courier_selector(courier_code))
        .await?;
    site.wait_and_click(session, &site.results_toggle).await?;
    site.wait_for(session, &site.results_table).await?;

    let rows = session.table_rows(&site.row_selector()).await?;
    let total = rows.len();
    let events: Vec<TrackingEvent> = rows
        .iter()
        .filter_map(|cells| TrackingEvent::from_cells(cells))
        .collect();

    tracing::debug!(
        courier = courier_code,
        rows = total,
        events = events.len(),
        "Results table read"
    );
    Ok(events)
}
