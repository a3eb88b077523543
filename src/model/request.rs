//! Outbound request description.
//!
//! A [`RequestSpec`] is built once per call from caller input and validated
//! at construction. It is never mutated afterwards; the cipher produces a new
//! encrypted copy instead.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use axum::http::header::{HeaderName, HeaderValue as WireHeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{RelayError, RelayResult};

/// Supported HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Head,
        Method::Options,
        Method::Connect,
        Method::Trace,
    ];

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| {
                let valid: Vec<&str> = Method::ALL.iter().map(Method::as_str).collect();
                RelayError::Validation(format!(
                    "Invalid HTTP method: {}. Valid methods are: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// A header value that may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// All values in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Append another occurrence, promoting a single value to a sequence.
    pub fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderValue::Multi(vec![first, value]);
            }
            HeaderValue::Multi(vs) => vs.push(value),
        }
    }

    /// Apply `f` to every value, keeping the shape.
    pub fn try_map<E, F>(&self, mut f: F) -> Result<HeaderValue, E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        Ok(match self {
            HeaderValue::Single(v) => HeaderValue::Single(f(v)?),
            HeaderValue::Multi(vs) => {
                HeaderValue::Multi(vs.iter().map(|v| f(v)).collect::<Result<_, _>>()?)
            }
        })
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

/// Header mapping, keyed by name.
pub type Headers = BTreeMap<String, HeaderValue>;

/// Query parameters.
pub type Params = BTreeMap<String, String>;

/// Request payload. Raw and JSON bodies are mutually exclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Raw text sent verbatim.
    Raw(String),
    /// Raw mapping sent form-encoded.
    Form(Map<String, Value>),
    /// JSON object sent as `application/json`.
    Json(Map<String, Value>),
}

/// Caller input, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestSpecInput {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub params: Option<Params>,
    #[serde(default)]
    pub headers: Option<Headers>,
    /// Raw body: a string or a mapping.
    #[serde(default)]
    pub data: Option<Value>,
    /// JSON body: a mapping.
    #[serde(default)]
    pub json_data: Option<Value>,
    /// Charset to try first when decoding the response.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Per-attempt timeout in seconds.
    #[serde(default)]
    pub timeout: Option<f64>,
}

/// A validated description of one outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) params: Params,
    pub(crate) headers: Headers,
    pub(crate) body: RequestBody,
    pub(crate) encoding_hint: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl RequestSpec {
    /// Validate caller input.
    pub fn new(input: RequestSpecInput) -> RelayResult<Self> {
        let method: Method = input.method.parse()?;
        validate_url(&input.url)?;

        let headers = input.headers.unwrap_or_default();
        validate_headers(&headers)?;

        let body = match (input.data, input.json_data) {
            (Some(_), Some(_)) => {
                return Err(RelayError::Validation(
                    "Raw body and JSON body are mutually exclusive".to_string(),
                ))
            }
            (Some(Value::String(text)), None) => RequestBody::Raw(text),
            (Some(Value::Object(map)), None) => RequestBody::Form(map),
            (Some(other), None) => {
                return Err(RelayError::Validation(format!(
                    "Raw body must be a string or a mapping, got {}",
                    kind_of(&other)
                )))
            }
            (None, Some(Value::Object(map))) => RequestBody::Json(map),
            (None, Some(other)) => {
                return Err(RelayError::Validation(format!(
                    "JSON body must be a mapping, got {}",
                    kind_of(&other)
                )))
            }
            (None, None) => RequestBody::Empty,
        };

        let timeout = match input.timeout {
            None => None,
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => {
                return Err(RelayError::Validation(format!(
                    "Timeout must be a positive number of seconds, got {}",
                    secs
                )))
            }
        };

        let encoding_hint = input
            .encoding
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(Self {
            method,
            url: input.url,
            params: input.params.unwrap_or_default(),
            headers,
            body,
            encoding_hint,
            timeout,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn encoding_hint(&self) -> Option<&str> {
        self.encoding_hint.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

fn validate_url(raw: &str) -> RelayResult<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| RelayError::Validation(format!("Invalid URL format: {}", e)))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RelayError::Validation(format!("URL has no host: {}", raw)));
    }
    Ok(())
}

fn validate_headers(headers: &Headers) -> RelayResult<()> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::Validation(format!("Invalid header name: {:?}", name)))?;
        for v in value.values() {
            WireHeaderValue::from_str(v).map_err(|_| {
                RelayError::Validation(format!("Invalid value for header {}", name))
            })?;
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(method: &str, url: &str) -> RequestSpecInput {
        RequestSpecInput {
            method: method.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_method_canonicalized() {
        let spec = RequestSpec::new(input("get", "https://api.example.com/x")).unwrap();
        assert_eq!(spec.method(), Method::Get);
        assert_eq!(spec.method().to_string(), "GET");

        assert_eq!(" Patch ".parse::<Method>().unwrap(), Method::Patch);
    }

    #[test]
    fn test_invalid_method_rejected() {
        let err = RequestSpec::new(input("FETCH", "https://api.example.com")).unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
        assert!(err.to_string().contains("FETCH"));
    }

    #[test]
    fn test_url_requires_scheme_and_host() {
        assert!(matches!(
            RequestSpec::new(input("GET", "api.example.com/x")),
            Err(RelayError::Validation(_))
        ));
        assert!(matches!(
            RequestSpec::new(input("GET", "mailto:someone@example.com")),
            Err(RelayError::Validation(_))
        ));
        assert!(RequestSpec::new(input("GET", "http://127.0.0.1:8080/path?q=1")).is_ok());
    }

    #[test]
    fn test_conflicting_bodies_rejected() {
        let mut raw = input("POST", "https://api.example.com");
        raw.data = Some(json!("text"));
        raw.json_data = Some(json!({"a": 1}));
        let err = RequestSpec::new(raw).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_body_variants() {
        let mut raw = input("POST", "https://api.example.com");
        raw.data = Some(json!("plain text"));
        assert_eq!(RequestSpec::new(raw).unwrap().body(), &RequestBody::Raw("plain text".into()));

        let mut form = input("POST", "https://api.example.com");
        form.data = Some(json!({"user": "alice"}));
        assert!(matches!(RequestSpec::new(form).unwrap().body(), RequestBody::Form(_)));

        let mut js = input("POST", "https://api.example.com");
        js.json_data = Some(json!({"nested": {"k": [1, 2]}}));
        assert!(matches!(RequestSpec::new(js).unwrap().body(), RequestBody::Json(_)));

        let mut bad = input("POST", "https://api.example.com");
        bad.json_data = Some(json!([1, 2, 3]));
        assert!(RequestSpec::new(bad).is_err());
    }

    #[test]
    fn test_header_validation() {
        let mut raw = input("GET", "https://api.example.com");
        let mut headers = Headers::new();
        headers.insert("bad header".into(), "v".into());
        raw.headers = Some(headers);
        assert!(RequestSpec::new(raw).is_err());

        let mut ok = input("GET", "https://api.example.com");
        let mut headers = Headers::new();
        headers.insert(
            "accept".into(),
            HeaderValue::Multi(vec!["text/html".into(), "application/json".into()]),
        );
        ok.headers = Some(headers);
        let spec = RequestSpec::new(ok).unwrap();
        assert_eq!(spec.headers()["accept"].values(), vec!["text/html", "application/json"]);
    }

    #[test]
    fn test_timeout_must_be_positive() {
        let mut raw = input("GET", "https://api.example.com");
        raw.timeout = Some(0.0);
        assert!(RequestSpec::new(raw).is_err());

        let mut ok = input("GET", "https://api.example.com");
        ok.timeout = Some(2.5);
        assert_eq!(RequestSpec::new(ok).unwrap().timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_header_value_push_promotes() {
        let mut value = HeaderValue::from("a=1");
        value.push("b=2".into());
        assert_eq!(value, HeaderValue::Multi(vec!["a=1".into(), "b=2".into()]));
    }

    #[test]
    fn test_input_deserializes_nulls() {
        let raw: RequestSpecInput = serde_json::from_value(json!({
            "method": "post",
            "url": "https://api.example.com/items",
            "params": null,
            "headers": {"x-multi": ["a", "b"], "x-single": "c"},
            "data": null,
            "json_data": {"id": 7}
        }))
        .unwrap();
        let spec = RequestSpec::new(raw).unwrap();
        assert!(spec.params().is_empty());
        assert_eq!(spec.headers()["x-multi"].values(), vec!["a", "b"]);
    }
}
