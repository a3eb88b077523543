use serde::{Deserialize, Serialize};

use super::request::Headers;
use crate::error::{RelayError, RelayResult};

/// Normalized upstream response returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    status_code: u16,
    text: String,
    headers: Headers,
    elapsed_seconds: f64,
    encoding: String,
    content_type: Option<String>,
}

impl ResponseEnvelope {
    /// Build an envelope, rejecting out-of-range status codes and
    /// non-positive elapsed times.
    pub fn new(
        status_code: u16,
        text: String,
        headers: Headers,
        elapsed_seconds: f64,
        encoding: String,
        content_type: Option<String>,
    ) -> RelayResult<Self> {
        if !(100..=599).contains(&status_code) {
            return Err(RelayError::Unexpected(format!(
                "status code {} outside 100..=599",
                status_code
            )));
        }
        if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
            return Err(RelayError::Unexpected(format!(
                "elapsed time must be positive, got {}",
                elapsed_seconds
            )));
        }

        Ok(Self {
            status_code,
            text,
            headers,
            elapsed_seconds,
            encoding,
            content_type,
        })
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    /// Charset the body was decoded with.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Swap in transformed text, headers and content type together.
    pub(crate) fn replace_content(
        &mut self,
        text: String,
        headers: Headers,
        content_type: Option<String>,
    ) {
        self.text = text;
        self.headers = headers;
        self.content_type = content_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::request::HeaderValue;

    fn headers() -> Headers {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), HeaderValue::from("text/plain"));
        headers
    }

    #[test]
    fn test_valid_envelope() {
        let env = ResponseEnvelope::new(
            200,
            "ok".into(),
            headers(),
            0.042,
            "ascii".into(),
            Some("text/plain".into()),
        )
        .unwrap();
        assert_eq!(env.status_code(), 200);
        assert_eq!(env.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_status_out_of_range_rejected() {
        let err =
            ResponseEnvelope::new(700, String::new(), Headers::new(), 0.1, "ascii".into(), None)
                .unwrap_err();
        assert!(matches!(err, RelayError::Unexpected(_)));

        assert!(
            ResponseEnvelope::new(99, String::new(), Headers::new(), 0.1, "ascii".into(), None)
                .is_err()
        );
    }

    #[test]
    fn test_non_positive_elapsed_rejected() {
        for elapsed in [-1.0, 0.0, f64::NAN] {
            let err = ResponseEnvelope::new(
                200,
                String::new(),
                Headers::new(),
                elapsed,
                "ascii".into(),
                None,
            )
            .unwrap_err();
            assert!(matches!(err, RelayError::Unexpected(_)));
        }
    }

    #[test]
    fn test_serialized_shape() {
        let env =
            ResponseEnvelope::new(201, "created".into(), headers(), 0.5, "utf-8".into(), None)
                .unwrap();
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["status_code"], 201);
        assert_eq!(value["text"], "created");
        assert_eq!(value["headers"]["content-type"], "text/plain");
        assert_eq!(value["elapsed_seconds"], 0.5);
        assert_eq!(value["encoding"], "utf-8");
        assert!(value["content_type"].is_null());
    }
}
