//! Layout of the tracking website and step-bounded page operations.

use std::future::Future;
use std::time::Duration;

use url::Url;

use crate::config::SiteConfig;
use crate::page::{PageSession, SessionError};

/// Everything a strategy needs to know about the source site.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub base_url: Url,
    pub resi_param: String,
    pub form_trigger: String,
    pub courier_option: String,
    pub results_toggle: String,
    pub results_table: String,
    /// Deadline for each navigation and wait-for-element step.
    pub step_timeout: Duration,
}

impl SiteProfile {
    pub fn from_config(config: &SiteConfig, step_timeout: Duration) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            resi_param: config.resi_param.clone(),
            form_trigger: config.form_trigger.clone(),
            courier_option: config.courier_option.clone(),
            results_toggle: config.results_toggle.clone(),
            results_table: config.results_table.clone(),
            step_timeout,
        })
    }

    /// Lookup URL for a tracking number. The resi is query-encoded.
    pub fn lookup_url(&self, resi: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair(&self.resi_param, resi);
        url
    }

    /// Selector of the carrier option for `courier_code`. The code is
    /// escaped so it cannot end the quoted attribute value early.
    pub fn courier_selector(&self, courier_code: &str) -> String {
        self.courier_option
            .replace("{courier}", &css_string_escape(courier_code))
    }

    /// Selector matching every row of the results table.
    pub fn row_selector(&self) -> String {
        format!("{} tr", self.results_table)
    }

    /// Navigate within the step deadline.
    pub async fn goto(&self, session: &mut dyn PageSession, url: &Url) -> Result<(), SessionError> {
        bounded(self.step_timeout, url.as_str(), session.goto(url.as_str())).await
    }

    /// Wait for `selector` within the step deadline, then click it.
    pub async fn wait_and_click(
        &self,
        session: &mut dyn PageSession,
        selector: &str,
    ) -> Result<(), SessionError> {
        self.wait_for(session, selector).await?;
        session.click(selector).await
    }

    /// Wait for `selector` within the step deadline.
    pub async fn wait_for(&self, session: &mut dyn PageSession, selector: &str) -> Result<(), SessionError> {
        bounded(self.step_timeout, selector, session.wait_for(selector)).await
    }
}

/// Backslash-escape the characters that end or break a quoted CSS string.
fn css_string_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\'' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn bounded<F>(limit: Duration, what: &str, step: F) -> Result<(), SessionError>
where
    F: Future<Output = Result<(), SessionError>>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout {
            selector: what.to_string(),
            after: limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SiteProfile {
        SiteProfile::from_config(&SiteConfig::default(), Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn lookup_url_encodes_resi() {
        let url = profile().lookup_url("JP 12&3");
        assert_eq!(url.as_str(), "https://cekresi.com/?noresi=JP+12%263");
    }

    #[test]
    fn courier_selector_fills_placeholder() {
        assert_eq!(profile().courier_selector("jne"), "a[onclick*=\"'jne'\"]");
        assert_eq!(profile().row_selector(), "#collapseTwo table tr");
    }

    #[test]
    fn courier_selector_escapes_quotes() {
        assert_eq!(
            profile().courier_selector("x\"]"),
            "a[onclick*=\"'x\\\"]'\"]"
        );
        assert_eq!(profile().courier_selector("o'k"), "a[onclick*=\"'o\\'k'\"]");
    }

    #[tokio::test]
    async fn bounded_step_times_out() {
        let result = bounded(Duration::from_millis(10), "#slow", std::future::pending()).await;
        assert_eq!(
            result,
            Err(SessionError::Timeout {
                selector: "#slow".into(),
                after: Duration::from_millis(10),
            })
        );
    }
}
