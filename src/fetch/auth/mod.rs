//! API-key placement for authenticated upstreams.

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::fetch::client::HttpClient;

/// Describes how an upstream expects its API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedAuth {
    /// No authentication required.
    None,
    /// API key must be appended as a URL query parameter with the given name.
    UrlParam { param_name: String },
    /// API key must be sent as an HTTP header with the given name.
    Header { header_name: String },
}

impl Default for FeedAuth {
    fn default() -> Self {
        FeedAuth::UrlParam {
            param_name: "key".to_string(),
        }
    }
}

impl FeedAuth {
    /// Returns `true` if any authentication credentials are needed.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, FeedAuth::None)
    }

    /// Wraps `inner` so that every request carries `key` as configured.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if a key is required but
    /// absent, or cannot be placed into a header.
    pub fn wrap<C: HttpClient + 'static>(
        &self,
        inner: C,
        key: Option<&str>,
    ) -> Result<Box<dyn HttpClient>, PipelineError> {
        match self {
            FeedAuth::None => Ok(Box::new(inner)),
            FeedAuth::UrlParam { param_name } => Ok(Box::new(UrlParam::new(
                inner,
                param_name.clone(),
                require_key(key)?,
            ))),
            FeedAuth::Header { header_name } => Ok(Box::new(ApiKey::new(
                inner,
                header_name,
                require_key(key)?,
            )?)),
        }
    }
}

fn require_key(key: Option<&str>) -> Result<&str, PipelineError> {
    key.filter(|k| !k.is_empty())
        .ok_or_else(|| PipelineError::configuration("missing API key for vehicle feed (GTFS_KEY)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubClient;

    fn get(url: &str) -> reqwest::Request {
        reqwest::Request::new(reqwest::Method::GET, url.parse().unwrap())
    }

    #[tokio::test]
    async fn test_url_param_appends_key() {
        let stub = StubClient::new().route("VehiclePositions.pb", 200, Vec::new());
        let client = FeedAuth::default()
            .wrap(stub.clone(), Some("secret"))
            .unwrap();

        client
            .execute(get("https://example.org/VehiclePositions.pb"))
            .await
            .unwrap();

        assert_eq!(
            stub.requested_urls(),
            vec!["https://example.org/VehiclePositions.pb?key=secret"]
        );
    }

    #[tokio::test]
    async fn test_url_param_replaces_existing_key() {
        let stub = StubClient::new().route("VehiclePositions.pb", 200, Vec::new());
        let client = FeedAuth::default()
            .wrap(stub.clone(), Some("secret"))
            .unwrap();

        client
            .execute(get("https://example.org/VehiclePositions.pb?format=pb&key=stale"))
            .await
            .unwrap();

        assert_eq!(
            stub.requested_urls(),
            vec!["https://example.org/VehiclePositions.pb?format=pb&key=secret"]
        );
    }

    #[tokio::test]
    async fn test_header_injects_key() {
        let stub = StubClient::new().route("feed", 200, Vec::new());
        let auth = FeedAuth::Header {
            header_name: "x-api-key".to_string(),
        };
        let client = auth.wrap(stub.clone(), Some("secret")).unwrap();

        client.execute(get("https://example.org/feed")).await.unwrap();

        assert_eq!(
            stub.requested_headers("x-api-key"),
            vec![Some("secret".to_string())]
        );
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = FeedAuth::default()
            .wrap(StubClient::new(), None)
            .err()
            .unwrap();
        assert_eq!(err.kind(), "ConfigurationError");

        let err = FeedAuth::default()
            .wrap(StubClient::new(), Some(""))
            .err()
            .unwrap();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_no_auth_needs_no_key() {
        assert!(!FeedAuth::None.requires_auth());
        assert!(FeedAuth::None.wrap(StubClient::new(), None).is_ok());
    }

    #[test]
    fn test_deserialize_tagged() {
        let auth: FeedAuth =
            serde_json::from_str(r#"{"type":"header","header_name":"x-api-key"}"#).unwrap();
        assert_eq!(
            auth,
            FeedAuth::Header {
                header_name: "x-api-key".to_string()
            }
        );
    }
}
