//! Tracking request and result types.

use serde::{Deserialize, Serialize};

use crate::tracking::error::TrackingError;

/// A lookup of one shipment at one carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRequest {
    /// Tracking number, passed through verbatim.
    pub resi: String,
    /// Carrier identifier.
    pub courier: String,
}

impl TrackingRequest {
    /// Build a request, rejecting blank fields.
    pub fn new(resi: impl Into<String>, courier: impl Into<String>) -> Result<Self, TrackingError> {
        let resi = resi.into();
        let courier = courier.into();
        if resi.trim().is_empty() {
            return Err(TrackingError::Validation("resi"));
        }
        if courier.trim().is_empty() {
            return Err(TrackingError::Validation("courier"));
        }
        Ok(Self { resi, courier })
    }

    /// Courier identifier in the form used for registry and cache lookups.
    pub fn courier_key(&self) -> String {
        self.courier.trim().to_lowercase()
    }
}

/// One row of a shipment's history, as rendered by the source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub date: String,
    pub status: String,
}

impl TrackingEvent {
    /// Build an event from a table row. Rows with fewer than two cells are rejected.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        match cells {
            [date, status, ..] => Some(Self {
                date: date.clone(),
                status: status.clone(),
            }),
            _ => None,
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingOutcome {
    pub events: Vec<TrackingEvent>,
    /// True when served from the cache without touching the source.
    pub cached: bool,
}
