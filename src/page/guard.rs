//! Scoped ownership of a page session.

use std::sync::Arc;

use crate::page::{PageProvider, PageSession, SessionError};

/// Owns an acquired session and guarantees it goes back to its provider.
///
/// The normal path calls [`SessionGuard::release`]. If the guard is dropped
/// instead (deadline expired, task cancelled), the release is spawned onto
/// the current runtime; closing the page is the only way to stop an
/// in-flight browser operation.
pub struct SessionGuard {
    provider: Arc<dyn PageProvider>,
    session: Option<Box<dyn PageSession>>,
}

impl SessionGuard {
    /// Acquire a session from `provider`.
    pub async fn acquire(provider: Arc<dyn PageProvider>) -> Result<Self, SessionError> {
        let session = provider.acquire().await?;
        tracing::debug!(user_agent = %session.user_agent(), "Page session acquired");
        Ok(Self {
            provider,
            session: Some(session),
        })
    }

    /// Borrow the session.
    pub fn session(&mut self) -> &mut dyn PageSession {
        match self.session.as_deref_mut() {
            Some(session) => session,
            None => unreachable!("session is only taken by release or drop"),
        }
    }

    /// Hand the session back to the provider.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            self.provider.release(session).await;
            tracing::debug!("Page session released");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Page session dropped mid-lookup, releasing in background");
                handle.spawn(async move {
                    provider.release(session).await;
                });
            }
            Err(_) => {
                tracing::warn!("Page session dropped outside a runtime, release skipped");
            }
        }
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("held", &self.session.is_some())
            .finish()
    }
}
