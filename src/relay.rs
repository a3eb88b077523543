//! The forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! RequestSpec
//!     → cipher (optional, encrypted copy)
//!     → dispatch (retrying send)
//!     → normalizer (decode body, canonical headers)
//!     → cipher (optional, decrypt text and headers)
//!     → ResponseEnvelope
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cipher::CipherContext;
use crate::dispatch::{DispatchOptions, Dispatcher, Transport};
use crate::error::RelayResult;
use crate::model::{RequestSpec, ResponseEnvelope};
use crate::normalizer::ResponseNormalizer;
use crate::resilience::{RetryPolicy, Sleeper};

/// Per-call settings resolved by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ForwardOptions {
    pub encrypt: bool,
    pub retry: RetryPolicy,
    /// Used when the request carries no timeout of its own.
    pub default_timeout: Duration,
    pub accept_error_status: bool,
}

pub struct Relay {
    dispatcher: Dispatcher,
    normalizer: ResponseNormalizer,
    cipher: Arc<CipherContext>,
}

impl Relay {
    pub fn new(transport: Arc<dyn Transport>, cipher: Arc<CipherContext>) -> Self {
        Self::from_parts(Dispatcher::new(transport), ResponseNormalizer::default(), cipher)
    }

    pub fn with_sleeper(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        cipher: Arc<CipherContext>,
    ) -> Self {
        Self::from_parts(
            Dispatcher::with_sleeper(transport, sleeper),
            ResponseNormalizer::default(),
            cipher,
        )
    }

    pub fn from_parts(
        dispatcher: Dispatcher,
        normalizer: ResponseNormalizer,
        cipher: Arc<CipherContext>,
    ) -> Self {
        Self {
            dispatcher,
            normalizer,
            cipher,
        }
    }

    /// Run one request through the pipeline.
    pub async fn execute(
        &self,
        spec: RequestSpec,
        options: &ForwardOptions,
    ) -> RelayResult<ResponseEnvelope> {
        let outbound = if options.encrypt {
            self.cipher.encrypt_request(&spec)?
        } else {
            spec
        };

        let dispatch = DispatchOptions {
            timeout: outbound.timeout().unwrap_or(options.default_timeout),
            accept_error_status: options.accept_error_status,
        };
        let raw = self
            .dispatcher
            .dispatch(&outbound, &options.retry, &dispatch)
            .await?;

        let envelope = self.normalizer.normalize(raw, outbound.encoding_hint())?;
        let envelope = if options.encrypt {
            self.normalizer.decrypt(&self.cipher, envelope)?
        } else {
            envelope
        };

        info!(
            method = %outbound.method(),
            status = envelope.status_code(),
            encrypted = options.encrypt,
            elapsed_seconds = envelope.elapsed_seconds(),
            "Relayed request"
        );
        debug!(encoding = %envelope.encoding(), "Response decoded");
        Ok(envelope)
    }
}
