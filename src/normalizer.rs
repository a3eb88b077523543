//! Turns a raw upstream response into a [`ResponseEnvelope`].

use tracing::debug;

use crate::cipher::CipherContext;
use crate::decoder::ContentDecoder;
use crate::dispatch::RawResponse;
use crate::error::RelayResult;
use crate::model::{HeaderValue, Headers, ResponseEnvelope};

#[derive(Default)]
pub struct ResponseNormalizer {
    decoder: ContentDecoder,
}

impl ResponseNormalizer {
    /// Decode the body and canonicalize headers.
    ///
    /// The charset hint is the caller's, falling back to the `charset`
    /// parameter of the response `Content-Type`.
    pub fn normalize(
        &self,
        raw: RawResponse,
        encoding_hint: Option<&str>,
    ) -> RelayResult<ResponseEnvelope> {
        let content_type = raw.header("content-type").map(str::to_owned);
        let hint = resolve_hint(encoding_hint, content_type.as_deref());

        let decoded = self.decoder.decode(&raw.body, hint.as_deref())?;
        debug!(
            status = raw.status,
            encoding = %decoded.encoding,
            bytes = raw.body.len(),
            "Normalized upstream response"
        );

        ResponseEnvelope::new(
            raw.status,
            decoded.text,
            canonical_headers(&raw.headers),
            raw.elapsed.as_secs_f64(),
            decoded.encoding,
            content_type,
        )
    }

    /// Decrypt the envelope's text and header values in place.
    pub fn decrypt(
        &self,
        cipher: &CipherContext,
        mut envelope: ResponseEnvelope,
    ) -> RelayResult<ResponseEnvelope> {
        cipher.decrypt_envelope(&mut envelope)?;
        Ok(envelope)
    }
}

/// Charset to try first: the caller's hint, else the `Content-Type` charset.
pub fn resolve_hint(encoding_hint: Option<&str>, content_type: Option<&str>) -> Option<String> {
    encoding_hint
        .map(str::to_owned)
        .or_else(|| content_type.and_then(charset_param))
}

/// Lower-case names; repeated headers collapse into a sequence.
pub fn canonical_headers(lines: &[(String, String)]) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in lines {
        let name = name.to_ascii_lowercase();
        match headers.get_mut(&name) {
            Some(existing) => existing.push(value.clone()),
            None => {
                headers.insert(name, HeaderValue::Single(value.clone()));
            }
        }
    }
    headers
}

/// `charset` parameter of a `Content-Type` value.
pub fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::generate_key;
    use crate::error::RelayError;
    use bytes::Bytes;
    use std::time::Duration;

    fn raw(status: u16, headers: &[(&str, &str)], body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Bytes::copy_from_slice(body),
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_plain_response() {
        let envelope = ResponseNormalizer::default()
            .normalize(raw(200, &[("Content-Type", "text/plain")], b"ok"), None)
            .unwrap();
        assert_eq!(envelope.status_code(), 200);
        assert_eq!(envelope.text(), "ok");
        assert_eq!(envelope.encoding(), "ascii");
        assert_eq!(envelope.content_type(), Some("text/plain"));
        assert_eq!(envelope.headers()["content-type"], HeaderValue::from("text/plain"));
        assert!(envelope.elapsed_seconds() > 0.0);
    }

    #[test]
    fn test_content_type_charset_used_as_hint() {
        let body = [0xD6, 0xD0, 0xCE, 0xC4];
        let envelope = ResponseNormalizer::default()
            .normalize(raw(200, &[("content-type", "text/html; charset=\"GBK\"")], &body), None)
            .unwrap();
        assert_eq!(envelope.text(), "中文");
        assert_eq!(envelope.encoding(), "gbk");
    }

    #[test]
    fn test_caller_hint_beats_header() {
        let body = "é".as_bytes();
        let envelope = ResponseNormalizer::default()
            .normalize(
                raw(200, &[("content-type", "text/plain; charset=utf-8")], body),
                Some("latin-1"),
            )
            .unwrap();
        assert_eq!(envelope.encoding(), "latin-1");
        assert_eq!(envelope.text(), "Ã©");
    }

    #[test]
    fn test_repeated_headers_collapse() {
        let headers = canonical_headers(&[
            ("Set-Cookie".into(), "a=1".into()),
            ("X-Id".into(), "7".into()),
            ("set-cookie".into(), "b=2".into()),
        ]);
        assert_eq!(
            headers["set-cookie"],
            HeaderValue::Multi(vec!["a=1".into(), "b=2".into()])
        );
        assert_eq!(headers["x-id"], HeaderValue::from("7"));
    }

    #[test]
    fn test_resolve_hint_order() {
        let content_type = Some("text/html; charset=big5");
        assert_eq!(resolve_hint(Some("gbk"), content_type), Some("gbk".into()));
        assert_eq!(resolve_hint(None, content_type), Some("big5".into()));
        assert_eq!(resolve_hint(None, Some("text/html")), None);
        assert_eq!(resolve_hint(None, None), None);
    }

    #[test]
    fn test_charset_param() {
        assert_eq!(charset_param("text/html; Charset=ISO-8859-1"), Some("ISO-8859-1".into()));
        assert_eq!(charset_param("application/json"), None);
        assert_eq!(charset_param("text/plain; charset="), None);
    }

    #[test]
    fn test_invalid_status_surfaces_unexpected() {
        let err = ResponseNormalizer::default()
            .normalize(raw(700, &[], b""), None)
            .unwrap_err();
        assert!(matches!(err, RelayError::Unexpected(_)));
    }

    #[test]
    fn test_decrypt_step() {
        let cipher = CipherContext::from_key(&generate_key()).unwrap();
        let token = cipher.encrypt("hidden").unwrap();
        let normalizer = ResponseNormalizer::default();
        let envelope = normalizer
            .normalize(raw(200, &[("x-sealed", token.as_str())], token.as_bytes()), None)
            .unwrap();

        let envelope = normalizer.decrypt(&cipher, envelope).unwrap();
        assert_eq!(envelope.text(), "hidden");
        assert_eq!(envelope.headers()["x-sealed"], HeaderValue::from("hidden"));
    }
}
