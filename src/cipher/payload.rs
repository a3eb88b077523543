//! String-level encryption.
//!
//! Token layout: `[scheme "://"] base64url(nonce || sealed(zlib(rest)))`.
//! The scheme, when present, is bound to the token as associated data so it
//! can stay readable without being alterable.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, OsRng, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::{CipherContext, CipherError};

const NONCE_LEN: usize = 24;
const SCHEME_DELIMITER: &str = "://";

/// Outcome of decrypting one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrypted {
    Plaintext(String),
    /// Not a token produced under this key, or altered in transit.
    AuthenticationFailed,
}

impl Decrypted {
    pub fn into_plaintext(self) -> Option<String> {
        match self {
            Decrypted::Plaintext(text) => Some(text),
            Decrypted::AuthenticationFailed => None,
        }
    }
}

impl CipherContext {
    /// Encrypt `plaintext`, keeping any URL scheme prefix in the clear.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let (scheme, rest) = split_scheme(plaintext);
        let compressed = compress(rest.as_bytes())?;

        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .aead
            .encrypt(
                &nonce,
                Payload {
                    msg: &compressed,
                    aad: scheme.unwrap_or_default().as_bytes(),
                },
            )
            .map_err(|e| CipherError::Seal(e.to_string()))?;

        let mut token = Vec::with_capacity(NONCE_LEN + sealed.len());
        token.extend_from_slice(nonce.as_slice());
        token.extend_from_slice(&sealed);
        let encoded = URL_SAFE.encode(token);

        Ok(match scheme {
            Some(scheme) => format!("{}{}{}", scheme, SCHEME_DELIMITER, encoded),
            None => encoded,
        })
    }

    /// Decrypt a token produced by [`CipherContext::encrypt`].
    ///
    /// Anything that fails authentication is reported as
    /// [`Decrypted::AuthenticationFailed`], never as an error. Errors are
    /// reserved for authentic tokens whose contents are unusable.
    pub fn decrypt(&self, ciphertext: &str) -> Result<Decrypted, CipherError> {
        let (scheme, rest) = split_scheme(ciphertext);

        let Ok(token) = URL_SAFE.decode(rest) else {
            return Ok(Decrypted::AuthenticationFailed);
        };
        if token.len() < NONCE_LEN {
            return Ok(Decrypted::AuthenticationFailed);
        }

        let (nonce, sealed) = token.split_at(NONCE_LEN);
        let opened = self.aead.decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: sealed,
                aad: scheme.unwrap_or_default().as_bytes(),
            },
        );
        let Ok(compressed) = opened else {
            return Ok(Decrypted::AuthenticationFailed);
        };

        let bytes = decompress(&compressed)?;
        String::from_utf8(bytes)
            .map(Decrypted::Plaintext)
            .map_err(|_| CipherError::Utf8)
    }
}

/// Split `value` into a leading URL scheme and the remainder.
///
/// Only a syntactically valid scheme (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`)
/// directly before the first `://` counts.
fn split_scheme(value: &str) -> (Option<&str>, &str) {
    if let Some(idx) = value.find(SCHEME_DELIMITER) {
        let scheme = &value[..idx];
        if is_scheme(scheme) {
            return (Some(scheme), &value[idx + SCHEME_DELIMITER.len()..]);
        }
    }
    (None, value)
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| CipherError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CipherError::Compression(e.to_string()))
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut out = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| CipherError::Decompression(e.to_string()))?;
    Ok(out)
}
