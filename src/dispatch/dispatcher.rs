//! Retrying dispatch.
//!
//! # Responsibilities
//! - Send one request spec through a [`Transport`]
//! - Retry error statuses and transport failures with exponential backoff
//! - Classify the final failure once the retry budget is spent
//!
//! # Design Decisions
//! - Attempts are driven by an explicit state machine
//! - Failures to even build a request are never retried
//! - Retry eligibility is decided by [`RelayError::is_retryable`]
//! - Each call owns its retry state; concurrent calls share nothing mutable

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::transport::{RawResponse, Transport, TransportError};
use crate::decoder::ContentDecoder;
use crate::error::{RelayError, RelayResult};
use crate::model::RequestSpec;
use crate::normalizer::resolve_hint;
use crate::observability::metrics;
use crate::resilience::{RetryPolicy, Sleeper, TokioSleeper};

/// Per-call dispatch settings.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Hand 4xx/5xx responses back instead of retrying them.
    pub accept_error_status: bool,
}

enum AttemptState {
    Attempting,
    Backoff(Duration),
    Done(RawResponse),
    Failed(RelayError),
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    decoder: ContentDecoder,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_sleeper(transport, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            transport,
            sleeper,
            decoder: ContentDecoder::default(),
        }
    }

    /// Send `spec`, retrying per `policy`.
    ///
    /// Makes at most `policy.max_retries + 1` attempts. A response with a
    /// status below 400 ends the call immediately.
    pub async fn dispatch(
        &self,
        spec: &RequestSpec,
        policy: &RetryPolicy,
        options: &DispatchOptions,
    ) -> RelayResult<RawResponse> {
        let mut attempt: u32 = 0;
        let mut state = AttemptState::Attempting;

        loop {
            state = match state {
                AttemptState::Attempting => {
                    debug!(method = %spec.method(), attempt, "Dispatching upstream request");
                    let outcome = self.transport.send(spec, options.timeout).await;
                    self.on_outcome(spec, outcome, attempt, policy, options)
                }
                AttemptState::Backoff(delay) => {
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                    AttemptState::Attempting
                }
                AttemptState::Done(response) => return Ok(response),
                AttemptState::Failed(err) => return Err(err),
            };
        }
    }

    fn on_outcome(
        &self,
        spec: &RequestSpec,
        outcome: Result<RawResponse, TransportError>,
        attempt: u32,
        policy: &RetryPolicy,
        options: &DispatchOptions,
    ) -> AttemptState {
        match outcome {
            Ok(response) if response.status < 400 || options.accept_error_status => {
                metrics::record_upstream_attempt("success");
                AttemptState::Done(response)
            }
            Ok(response) => {
                metrics::record_upstream_attempt("error_status");
                let err = RelayError::HttpStatus {
                    status: response.status,
                    body: self.error_body(spec, &response),
                };
                self.retry_or_fail(err, "status", attempt, policy)
            }
            Err(TransportError::InvalidRequest(cause)) => {
                metrics::record_upstream_attempt("invalid");
                self.retry_or_fail(RelayError::Unexpected(cause), "invalid", attempt, policy)
            }
            Err(err) => {
                metrics::record_upstream_attempt("transport_error");
                let reason = match err {
                    TransportError::Timeout(_) => "timeout",
                    _ => "network",
                };
                self.retry_or_fail(RelayError::request(err.to_string()), reason, attempt, policy)
            }
        }
    }

    /// Upstream error body as text, decoded like a successful response.
    fn error_body(&self, spec: &RequestSpec, response: &RawResponse) -> String {
        let hint = resolve_hint(spec.encoding_hint(), response.header("content-type"));
        match self.decoder.decode(&response.body, hint.as_deref()) {
            Ok(decoded) => decoded.text,
            Err(err) => {
                debug!(error = %err, "Error body undecodable, replacing invalid bytes");
                String::from_utf8_lossy(&response.body).into_owned()
            }
        }
    }

    fn retry_or_fail(
        &self,
        err: RelayError,
        reason: &'static str,
        attempt: u32,
        policy: &RetryPolicy,
    ) -> AttemptState {
        if err.is_retryable() && attempt + 1 < policy.max_attempts() {
            let delay = policy.delay_for(attempt);
            info!(attempt, delay = ?delay, reason, error = %err, "Retrying upstream request");
            metrics::record_retry(reason);
            AttemptState::Backoff(delay)
        } else {
            error!(
                attempts = attempt + 1,
                reason,
                error = %err,
                "Upstream request failed"
            );
            AttemptState::Failed(err)
        }
    }
}
