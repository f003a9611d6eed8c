//! Webhook delivery of run reports
//!
//! Delivery failures are logged and returned to the caller; they never touch
//! the run that produced the report.

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::reporting::report::{GenerationReport, RunReport};

/// Posts JSON reports to a fixed URL
#[derive(Clone, Debug)]
pub struct WebhookReporter {
    url: String,
    http: reqwest::Client,
}

impl WebhookReporter {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Use a preconfigured client (timeouts, proxies)
    pub fn with_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<T: Serialize>(&self, payload: &T) -> Result<(), ReportError> {
        let body = serde_json::to_vec(payload)?;
        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "Report delivery failed");
                ReportError::Transport(e.to_string())
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(url = %self.url, status = %status, body = %body, "Report endpoint returned non-success");
            return Err(ReportError::Status(status.as_u16()));
        }

        debug!(url = %self.url, "Report delivered");
        Ok(())
    }

    /// Deliver a finished run
    pub async fn send_run(&self, report: &RunReport) -> Result<(), ReportError> {
        self.post(report).await
    }

    /// Deliver one generation
    pub async fn send_generation(&self, report: &GenerationReport) -> Result<(), ReportError> {
        self.post(report).await
    }
}
