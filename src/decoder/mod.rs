//! Response body decoding.
//!
//! Bytes are decoded with the first charset that accepts them, in this order:
//! the caller's hint, a fixed priority list, then statistical detection.

pub mod charset;

pub use charset::Charset;

use chardetng::EncodingDetector;
use tracing::{debug, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::observability::metrics;

/// Guesses a charset label from raw bytes.
pub trait CharsetDetector: Send + Sync {
    /// A label, or `None` when the guess is not confident.
    fn detect(&self, bytes: &[u8]) -> Option<String>;
}

/// Statistical detection backed by `chardetng`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticalDetector;

impl CharsetDetector for StatisticalDetector {
    fn detect(&self, bytes: &[u8]) -> Option<String> {
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let (encoding, confident) = detector.guess_assess(None, true);
        confident.then(|| encoding.name().to_string())
    }
}

/// Fixed candidate order tried after the hint.
pub fn default_candidates() -> Vec<Charset> {
    vec![
        Charset::Ascii,
        Charset::Utf8,
        Charset::Utf16,
        Charset::Utf32,
        Charset::Latin1,
        Charset::Encoding(encoding_rs::GBK),
        Charset::Encoding(encoding_rs::GB18030),
        Charset::Encoding(encoding_rs::BIG5),
        Charset::Encoding(encoding_rs::SHIFT_JIS),
        Charset::Encoding(encoding_rs::EUC_JP),
        Charset::Encoding(encoding_rs::EUC_KR),
    ]
}

/// Decoded body and the charset that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: String,
}

pub struct ContentDecoder {
    candidates: Vec<Charset>,
    detector: Box<dyn CharsetDetector>,
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self::with_candidates(default_candidates())
    }
}

impl ContentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(candidates: Vec<Charset>) -> Self {
        Self {
            candidates,
            detector: Box::new(StatisticalDetector),
        }
    }

    pub fn with_detector(mut self, detector: impl CharsetDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Decode `content`, trying `hint` first.
    ///
    /// Fails with [`RelayError::Decoding`] listing every charset attempted.
    pub fn decode(&self, content: &[u8], hint: Option<&str>) -> RelayResult<Decoded> {
        let mut attempted = Vec::new();

        if let Some(label) = hint {
            if let Some(decoded) = self.try_label(label, content, &mut attempted) {
                return Ok(decoded);
            }
            metrics::record_decode_fallback("hint");
        }

        for charset in &self.candidates {
            attempted.push(charset.name());
            if let Some(text) = charset.decode(content) {
                return Ok(Decoded {
                    text,
                    encoding: charset.name(),
                });
            }
            debug!(charset = %charset.name(), "Candidate charset rejected body");
        }

        metrics::record_decode_fallback("candidates");
        if let Some(label) = self.detector.detect(content) {
            info!(label = %label, "Falling back to detected charset");
            if let Some(decoded) = self.try_label(&label, content, &mut attempted) {
                return Ok(decoded);
            }
        }

        warn!(
            bytes = content.len(),
            attempted = %attempted.join(", "),
            "Response body could not be decoded"
        );
        Err(RelayError::Decoding { attempted })
    }

    fn try_label(
        &self,
        label: &str,
        content: &[u8],
        attempted: &mut Vec<String>,
    ) -> Option<Decoded> {
        match Charset::from_label(label) {
            Some(charset) => {
                attempted.push(charset.name());
                charset.decode(content).map(|text| Decoded {
                    text,
                    encoding: charset.name(),
                })
            }
            None => {
                debug!(label = %label, "Unknown charset label");
                attempted.push(label.to_string());
                None
            }
        }
    }
}
