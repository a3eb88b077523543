//! Field-wise application of the cipher to nested data.
//!
//! Only string leaves are transformed. Mapping keys, numbers, booleans and
//! nulls pass through untouched, so the shape of the data survives.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{CipherContext, CipherError, Decrypted};
use crate::model::{HeaderValue, Headers, RequestBody, RequestSpec, ResponseEnvelope};
use crate::observability::metrics;

/// Rebuild `value` with every string leaf replaced by `f(leaf)`.
pub fn map_strings<E, F>(value: &Value, f: &mut F) -> Result<Value, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    Ok(match value {
        Value::String(s) => Value::String(f(s)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| map_strings(item, f))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(map_object(map, f)?),
        other => other.clone(),
    })
}

fn map_object<E, F>(map: &Map<String, Value>, f: &mut F) -> Result<Map<String, Value>, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    map.iter()
        .map(|(k, v)| -> Result<(String, Value), E> { Ok((k.clone(), map_strings(v, f)?)) })
        .collect()
}

/// Count of values left as received because they failed authentication.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecryptReport {
    pub decrypted: usize,
    pub rejected: Vec<String>,
}

impl CipherContext {
    /// Encrypt every string leaf of `value`.
    pub fn encrypt_value(&self, value: &Value) -> Result<Value, CipherError> {
        map_strings(value, &mut |s| self.encrypt(s))
    }

    /// Produce an encrypted copy of `spec`.
    ///
    /// URL, query parameter values, header values and string leaves of either
    /// body are sealed. Method, timeout and the encoding hint stay readable.
    pub fn encrypt_request(&self, spec: &RequestSpec) -> Result<RequestSpec, CipherError> {
        let url = self.encrypt(spec.url())?;

        let params = spec
            .params()
            .iter()
            .map(|(k, v)| -> Result<(String, String), CipherError> {
                Ok((k.clone(), self.encrypt(v)?))
            })
            .collect::<Result<_, CipherError>>()?;

        let headers = spec
            .headers()
            .iter()
            .map(|(k, v)| -> Result<(String, HeaderValue), CipherError> {
                Ok((k.clone(), v.try_map(|s| self.encrypt(s))?))
            })
            .collect::<Result<_, CipherError>>()?;

        let body = match spec.body() {
            RequestBody::Empty => RequestBody::Empty,
            RequestBody::Raw(text) => RequestBody::Raw(self.encrypt(text)?),
            RequestBody::Form(map) => RequestBody::Form(map_object(map, &mut |s| self.encrypt(s))?),
            RequestBody::Json(map) => RequestBody::Json(map_object(map, &mut |s| self.encrypt(s))?),
        };

        debug!(
            params = spec.params().len(),
            headers = spec.headers().len(),
            "Encrypted outbound request fields"
        );

        Ok(RequestSpec {
            url,
            params,
            headers,
            body,
            ..spec.clone()
        })
    }

    /// Decrypt `value` if authentic, otherwise hand it back unchanged.
    fn decrypt_or_keep(
        &self,
        field: &str,
        value: &str,
        report: &mut DecryptReport,
    ) -> Result<String, CipherError> {
        match self.decrypt(value)? {
            Decrypted::Plaintext(text) => {
                report.decrypted += 1;
                Ok(text)
            }
            Decrypted::AuthenticationFailed => {
                report.rejected.push(field.to_string());
                Ok(value.to_string())
            }
        }
    }

    /// Decrypt the text and header values of `envelope`.
    ///
    /// Values that fail authentication are kept as received. The content type
    /// follows the decrypted `content-type` header. The envelope is only
    /// modified if every field was processed without error.
    pub fn decrypt_envelope(
        &self,
        envelope: &mut ResponseEnvelope,
    ) -> Result<DecryptReport, CipherError> {
        let mut report = DecryptReport::default();

        let text = self.decrypt_or_keep("text", envelope.text(), &mut report)?;

        let mut headers = Headers::new();
        for (name, value) in envelope.headers() {
            let field = format!("headers.{}", name);
            let decrypted = value.try_map(|s| self.decrypt_or_keep(&field, s, &mut report))?;
            headers.insert(name.clone(), decrypted);
        }

        for field in &report.rejected {
            warn!(field = %field, "Response value failed authentication, leaving as received");
            metrics::record_decrypt_failure(field_kind(field));
        }

        // Content type mirrors the first Content-Type line, now in the clear.
        let content_type = envelope.content_type().and_then(|_| {
            headers
                .get("content-type")
                .and_then(|value| value.values().first().map(|s| s.to_string()))
        });

        envelope.replace_content(text, headers, content_type);
        Ok(report)
    }
}

fn field_kind(field: &str) -> &'static str {
    if field == "text" {
        "text"
    } else {
        "header"
    }
}
