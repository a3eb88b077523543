//! One HTTP exchange with the upstream.

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{RequestBody, RequestSpec};

/// Upstream response before normalization.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Header lines in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub elapsed: Duration,
}

impl RawResponse {
    /// First value of header `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Network(String),

    /// The request could not be built at all. Retrying will not help.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single exchange, bounded by `timeout`.
    async fn send(&self, spec: &RequestSpec, timeout: Duration)
        -> Result<RawResponse, TransportError>;
}

/// Transport over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(describe(&e)))?;
        Ok(Self { client })
    }

    fn build(
        &self,
        spec: &RequestSpec,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = reqwest::Method::from_bytes(spec.method().as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, spec.url()).timeout(timeout);

        if !spec.params().is_empty() {
            builder = builder.query(spec.params());
        }

        for (name, value) in spec.headers() {
            for v in value.values() {
                builder = builder.header(name.as_str(), v);
            }
        }

        builder = match spec.body() {
            RequestBody::Empty => builder,
            RequestBody::Raw(text) => builder.body(text.clone()),
            RequestBody::Form(map) => builder.form(&form_pairs(map)),
            RequestBody::Json(map) => builder.json(map),
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        spec: &RequestSpec,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let builder = self.build(spec, timeout)?;

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

        Ok(RawResponse {
            status,
            headers,
            body,
            elapsed: started.elapsed(),
        })
    }
}

/// Flatten a form mapping. Non-string leaves are sent as their JSON text.
fn form_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_builder() {
        TransportError::InvalidRequest(describe(&err))
    } else {
        TransportError::Network(describe(&err))
    }
}

/// Error text including its source chain.
fn describe(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
