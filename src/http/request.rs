//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Parse the relay call body into a request spec and per-call options
//! - Read the encryption toggle header
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Per-call retry settings fall back to the live configuration

use axum::http::{HeaderMap, HeaderValue, Request};
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::RelayResult;
use crate::model::{RequestSpec, RequestSpecInput};
use crate::relay::ForwardOptions;
use crate::resilience::RetryPolicy;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Makes a fresh UUID v4 request ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayRequestId;

impl MakeRequestId for RelayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID carried by `headers`, if any.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Partial retry override; missing fields use configured defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct RetryOverride {
    pub max_retries: Option<u32>,
    pub backoff_factor: Option<f64>,
}

/// Body of `POST /mock/request`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayRequest {
    #[serde(flatten)]
    pub spec: RequestSpecInput,
    #[serde(default)]
    pub retry: Option<RetryOverride>,
    #[serde(default)]
    pub accept_error_status: bool,
}

impl RelayRequest {
    /// Validate into a spec and resolve options against `config`.
    pub fn resolve(
        self,
        config: &RelayConfig,
        encrypt: bool,
    ) -> RelayResult<(RequestSpec, ForwardOptions)> {
        let retry = match self.retry {
            None => config.retries.policy(),
            Some(o) => RetryPolicy::new(
                o.max_retries.unwrap_or(config.retries.max_retries),
                o.backoff_factor.unwrap_or(config.retries.backoff_factor),
            )?,
        };
        let spec = RequestSpec::new(self.spec)?;

        Ok((
            spec,
            ForwardOptions {
                encrypt,
                retry,
                default_timeout: config.timeouts.upstream(),
                accept_error_status: self.accept_error_status,
            },
        ))
    }
}

/// Whether header `name` carries a truthy value (`1`, `true`, `yes`, `on`).
pub fn toggle_enabled(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}
