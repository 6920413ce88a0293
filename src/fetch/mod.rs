mod basic;
mod client;
mod retry;
pub mod auth;

#[cfg(test)]
pub(crate) mod stub;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use retry::{MAX_ATTEMPTS, RetryPolicy};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// GETs `url` and returns the body of a successful response.
///
/// `context` names the upstream in error details; the URL itself is never
/// included. Transient failures are retried according to `retry`.
///
/// # Errors
///
/// [`PipelineError::Upstream`] on transport failure or non-success status,
/// [`PipelineError::Configuration`] if `url` does not parse.
#[tracing::instrument(skip(client, url, retry), fields(attempts = retry.attempts()))]
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    retry: &RetryPolicy,
    context: &str,
) -> Result<Bytes, PipelineError> {
    let url: reqwest::Url = url
        .parse()
        .map_err(|_| PipelineError::configuration(format!("{context}: invalid upstream URL")))?;

    let attempts = retry.attempts();
    let mut attempt = 1;
    loop {
        match fetch_once(client, &url, context).await {
            Ok(bytes) => {
                debug!(bytes = bytes.len(), attempt, "Upstream response received");
                return Ok(bytes);
            }
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = retry.delay_after(attempt);
                warn!(
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient upstream failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// [`fetch_bytes`] followed by JSON parsing.
///
/// # Errors
///
/// As [`fetch_bytes`], plus [`PipelineError::Decode`] for malformed JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    retry: &RetryPolicy,
    context: &str,
) -> Result<serde_json::Value, PipelineError> {
    let bytes = fetch_bytes(client, url, retry, context).await?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::decode(context, e))
}

async fn fetch_once<C: HttpClient + ?Sized>(
    client: &C,
    url: &reqwest::Url,
    context: &str,
) -> Result<Bytes, PipelineError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());

    let resp = client
        .execute(req)
        .await
        .map_err(|e| PipelineError::transport(context, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PipelineError::upstream_status(context, status.as_u16()));
    }

    resp.bytes()
        .await
        .map_err(|e| PipelineError::transport(context, e))
}
