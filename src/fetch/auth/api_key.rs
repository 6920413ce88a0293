use crate::error::PipelineError;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once at construction, so a bad
/// configuration surfaces as a [`PipelineError::Configuration`] before any
/// request is sent.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self, PipelineError> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes()).map_err(|_| {
            PipelineError::configuration(format!("invalid API key header name '{header_name}'"))
        })?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|_| PipelineError::configuration("API key is not a valid header value"))?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
