//! Headless Chromium page provider backed by chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;

use crate::config::PageConfig;
use crate::page::{PageProvider, PageSession, SessionError, UserAgentPool};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn unavailable(context: &str, err: impl std::fmt::Display) -> SessionError {
    SessionError::Unavailable(format!("{context}: {err}"))
}

/// Whether a lookup failed only because the node is not in the DOM yet.
/// Transport failures mean the browser or page is gone.
fn is_missing_element(err: &CdpError) -> bool {
    matches!(err, CdpError::NotFound | CdpError::Chrome(_))
}

/// Launches one browser and opens a fresh page per session.
pub struct ChromiumPageProvider {
    browser: Browser,
    agents: UserAgentPool,
}

impl ChromiumPageProvider {
    /// Launch the browser described by `config`.
    pub async fn launch(config: &PageConfig) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| unavailable("invalid browser config", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| unavailable("failed to launch Chromium", e))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser handler event error");
                }
            }
        });

        tracing::info!(headless = config.headless, "Chromium launched");

        Ok(Self {
            browser,
            agents: UserAgentPool::new(config.user_agents.iter().cloned()),
        })
    }
}

#[async_trait]
impl PageProvider for ChromiumPageProvider {
    async fn acquire(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let user_agent = self.agents.pick().to_string();
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| unavailable("failed to open page", e))?;

        if let Err(e) = page
            .set_user_agent(SetUserAgentOverrideParams::new(user_agent.clone()))
            .await
        {
            let _ = page.close().await;
            return Err(unavailable("failed to set user agent", e));
        }

        Ok(Box::new(ChromiumSession { page, user_agent }))
    }

    async fn release(&self, session: Box<dyn PageSession>) {
        session.close().await;
    }
}

struct ChromiumSession {
    page: Page,
    user_agent: String,
}

#[async_trait]
impl PageSession for ChromiumSession {
    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        let navigation_error = |e: CdpError| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        self.page.goto(url).await.map_err(navigation_error)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(navigation_error)?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str) -> Result<(), SessionError> {
        // Bounded by the caller's step timeout.
        loop {
            match self.page.find_element(selector).await {
                Ok(_) => return Ok(()),
                Err(e) if is_missing_element(&e) => {}
                Err(e) => return Err(unavailable("page lost while waiting", e)),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn table_rows(&mut self, selector: &str) -> Result<Vec<Vec<String>>, SessionError> {
        let quoted = serde_json::to_string(selector)
            .map_err(|e| SessionError::ElementNotFound(e.to_string()))?;
        let script = format!(
            "Array.from(document.querySelectorAll({quoted})).map(row => \
             Array.from(row.querySelectorAll('td')).map(cell => cell.innerText.trim()))"
        );
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?;
        result
            .into_value::<Vec<Vec<String>>>()
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "Page close failed");
        }
    }
}
