//! Error taxonomy for the forwarding pipeline.
//!
//! Every failure that leaves the pipeline is one of these variants. The
//! routing layer renders them directly as `{status_code, detail}`.
//! Authentication failures on ciphertext are not errors; see
//! [`crate::cipher::Decrypted`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detail shown to callers for failures we did not anticipate.
pub const GENERIC_DETAIL: &str = "Internal Server Error";

/// Classification status used for transport failures.
pub const REQUEST_ERROR_STATUS: u16 = 500;

/// Errors produced by the request-forwarding pipeline.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed request spec (bad method, unparseable URL, conflicting bodies).
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Invalid cipher material or an internal cryptographic failure.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// No candidate encoding could decode the response body.
    #[error("Failed to decode content. Tried encodings: [{}]", .attempted.join(", "))]
    Decoding { attempted: Vec<String> },

    /// Upstream kept answering with an error status until retries ran out.
    #[error("Upstream returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    /// Transport failure (connect, timeout, DNS, ...) after retries ran out.
    #[error("Upstream request failed: {cause}")]
    Request { status: u16, cause: String },

    /// Anything else. Never retried.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result type for pipeline operations.
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// Build a transport failure with the generic 500 classification.
    pub fn request(cause: impl Into<String>) -> Self {
        RelayError::Request {
            status: REQUEST_ERROR_STATUS,
            cause: cause.into(),
        }
    }

    /// HTTP status this error renders as.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 422,
            RelayError::Encryption(_) => 500,
            RelayError::Decoding { .. } => 502,
            RelayError::HttpStatus { status, .. } => *status,
            RelayError::Request { status, .. } => *status,
            RelayError::Unexpected(_) => 500,
        }
    }

    /// Human-readable detail for the caller.
    ///
    /// Upstream bodies are passed through verbatim. Unexpected failures only
    /// ever expose [`GENERIC_DETAIL`]; the cause stays in the server log.
    pub fn detail(&self) -> String {
        match self {
            RelayError::HttpStatus { body, .. } => body.clone(),
            RelayError::Request { cause, .. } => cause.clone(),
            RelayError::Unexpected(_) => GENERIC_DETAIL.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error may be retried by the dispatcher.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::HttpStatus { .. } | RelayError::Request { .. })
    }

    /// Serializable body for HTTP rendering.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status_code(),
            detail: self.detail(),
        }
    }
}

/// Wire shape of an error returned to the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub detail: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let RelayError::Unexpected(cause) = &self {
            tracing::error!(cause = %cause, "Unexpected failure while relaying request");
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RelayError::Validation("bad".into()).status_code(), 422);
        assert_eq!(RelayError::Encryption("key".into()).status_code(), 500);
        assert_eq!(
            RelayError::HttpStatus { status: 404, body: "missing".into() }.status_code(),
            404
        );
        assert_eq!(RelayError::request("connection refused").status_code(), 500);
        assert_eq!(RelayError::Decoding { attempted: vec![] }.status_code(), 502);
    }

    #[test]
    fn test_unexpected_detail_is_generic() {
        let err = RelayError::Unexpected("index out of bounds in parser".into());
        assert_eq!(err.detail(), GENERIC_DETAIL);
        assert!(err.to_string().contains("index out of bounds"));
    }

    #[test]
    fn test_upstream_body_passed_verbatim() {
        let err = RelayError::HttpStatus { status: 503, body: "{\"busy\":true}".into() };
        assert_eq!(err.detail(), "{\"busy\":true}");
        assert_eq!(err.to_body(), ErrorBody { status_code: 503, detail: "{\"busy\":true}".into() });
    }

    #[test]
    fn test_decoding_error_lists_attempts() {
        let err = RelayError::Decoding {
            attempted: vec!["utf-8".into(), "gbk".into()],
        };
        assert_eq!(err.to_string(), "Failed to decode content. Tried encodings: [utf-8, gbk]");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RelayError::request("timeout").is_retryable());
        assert!(RelayError::HttpStatus { status: 500, body: String::new() }.is_retryable());
        assert!(!RelayError::Unexpected("boom".into()).is_retryable());
        assert!(!RelayError::Validation("bad".into()).is_retryable());
    }
}
