use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::fetch::client::HttpClient;

/// Puts the API key into the query string, e.g. Samtrafiken's `?key=...`.
///
/// A parameter of the same name already present in the configured URL is
/// replaced rather than duplicated. The key ends up in the URL, so errors
/// built from responses behind this wrapper must drop it (see
/// [`crate::error::PipelineError::transport`]).
pub struct UrlParam<C> {
    inner: C,
    param_name: String,
    key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: Request) -> reqwest::Result<Response> {
        let kept: Vec<(String, String)> = req
            .url()
            .query_pairs()
            .filter(|(name, _)| name != self.param_name.as_str())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        req.url_mut()
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}
