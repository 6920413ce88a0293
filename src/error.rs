//! Error taxonomy for a single pipeline invocation.

/// A hard failure that aborts the whole invocation.
///
/// Entity-level problems (missing position, non-finite coordinates, sites
/// without a usable coordinate) are never reported through this type; they
/// are counted in [`crate::stats::NormalizeStats`] and skipped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required setting or secret is absent or invalid.
    #[error("{message}")]
    Configuration { message: String },

    /// Transport failure or a non-success status from an upstream call.
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// The upstream payload could not be decoded.
    #[error("{message}")]
    Decode { message: String },

    /// The caller cancelled the invocation or its deadline passed.
    #[error("invocation cancelled before completion")]
    Cancelled,
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn upstream_status(context: &str, status: u16) -> Self {
        Self::Upstream {
            status: Some(status),
            message: format!("{context}: upstream returned status {status}"),
        }
    }

    pub fn decode(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: format!("{context}: {err}"),
        }
    }

    /// Wraps a transport error. The URL is stripped so that query-string
    /// API keys never reach a response body or a log line.
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let err = err.without_url();
        Self::Upstream {
            status,
            message: format!("{context}: {err}"),
        }
    }

    /// Short machine-readable kind, used as the `error` field of failure
    /// responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "ConfigurationError",
            Self::Upstream { .. } => "UpstreamError",
            Self::Decode { .. } => "DecodeError",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Human-readable detail string for failure responses.
    pub fn details(&self) -> String {
        self.to_string()
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Upstream {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            Self::Upstream { status: None, .. } => true,
            _ => false,
        }
    }
}

impl From<prost::DecodeError> for PipelineError {
    fn from(err: prost::DecodeError) -> Self {
        Self::decode("vehicle feed", err)
    }
}
