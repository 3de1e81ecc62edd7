//! Browser page capability consumed by the tracking service.
//!
//! Defines the `PageProvider` and `PageSession` traits that abstract over
//! the browser engine. The service never drives a browser directly; it
//! acquires one single-use session per lookup and always hands it back.

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod guard;
pub mod user_agent;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use guard::SessionGuard;
pub use user_agent::UserAgentPool;

/// Errors raised by a page session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {}ms waiting for {selector}", .after.as_millis())]
    Timeout { selector: String, after: Duration },

    #[error("{0}")]
    Unavailable(String),
}

/// A single browser page owned by one lookup.
#[async_trait]
pub trait PageSession: Send {
    /// User agent this session presents.
    fn user_agent(&self) -> &str;

    /// Navigate to a URL and wait for the document to load.
    async fn goto(&mut self, url: &str) -> Result<(), SessionError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Wait until an element matching `selector` exists.
    async fn wait_for(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Trimmed text of the `td` cells of every row matching `selector`.
    async fn table_rows(&mut self, selector: &str) -> Result<Vec<Vec<String>>, SessionError>;

    /// Close the page.
    async fn close(self: Box<Self>);
}

/// Source of page sessions.
#[async_trait]
pub trait PageProvider: Send + Sync {
    /// Open a fresh session with a user agent drawn from the pool.
    async fn acquire(&self) -> Result<Box<dyn PageSession>, SessionError>;

    /// Dispose of a session. Must be called once per acquired session.
    async fn release(&self, session: Box<dyn PageSession>);
}

/// Provider used when no browser engine is compiled in.
///
/// Every acquisition fails, so lookups surface a session error and the
/// breaker eventually opens.
#[derive(Debug, Default)]
pub struct UnavailablePageProvider;

#[async_trait]
impl PageProvider for UnavailablePageProvider {
    async fn acquire(&self) -> Result<Box<dyn PageSession>, SessionError> {
        Err(SessionError::Unavailable(
            "no browser engine available (build with the `chromium` feature)".to_string(),
        ))
    }

    async fn release(&self, session: Box<dyn PageSession>) {
        session.close().await;
    }
}
