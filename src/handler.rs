//! Maps an invocation outcome onto the HTTP contract, independent of any
//! web framework.

use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::PipelineError;

/// Body of a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatResponse {
    pub status: u16,
    pub body: Value,
}

impl HeatResponse {
    pub fn from_result(result: Result<FeatureCollection, PipelineError>) -> Self {
        match result {
            Ok(collection) => match serde_json::to_value(&collection) {
                Ok(body) => Self { status: 200, body },
                Err(e) => Self::error("EncodeError", e.to_string()),
            },
            Err(err) => {
                error!(kind = err.kind(), error = %err, "Pipeline failed");
                Self::error(err.kind(), err.details())
            }
        }
    }

    fn error(kind: &str, details: String) -> Self {
        let body = ErrorBody {
            error: kind.to_string(),
            details,
        };
        Self {
            status: 500,
            body: serde_json::json!(body),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}
