use std::time::Duration;

use super::client::HttpClient;
use crate::error::PipelineError;
use async_trait::async_trait;

/// Plain `reqwest` client. One instance is built per pipeline invocation so
/// that pooled connections are shared between that invocation's requests
/// and nothing else.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }

    pub fn with_timeouts(
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                PipelineError::configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self(client))
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
