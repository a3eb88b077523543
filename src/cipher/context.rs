use std::env::{self, VarError};
use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use chacha20poly1305::aead::{KeyInit, OsRng};
use chacha20poly1305::XChaCha20Poly1305;
use tracing::{info, warn};

use super::CipherError;

/// Environment variable holding the shared key.
pub const KEY_ENV_VAR: &str = "ENCRYPTION_KEY";

/// Raw key length in bytes.
pub const KEY_LEN: usize = 32;

/// Shared symmetric key, loaded once at startup.
///
/// Both relay instances of a pair must hold the same key. The key is
/// URL-safe base64 of 32 random bytes.
pub struct CipherContext {
    pub(super) aead: XChaCha20Poly1305,
}

impl CipherContext {
    /// Build a context from an encoded key.
    pub fn from_key(encoded: &str) -> Result<Self, CipherError> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Err(CipherError::InvalidKey("key is empty".to_string()));
        }

        let raw = URL_SAFE
            .decode(trimmed)
            .or_else(|_| STANDARD.decode(trimmed))
            .map_err(|_| CipherError::InvalidKey("key is not valid base64".to_string()))?;
        if raw.len() != KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "key must decode to {} bytes, got {}",
                KEY_LEN,
                raw.len()
            )));
        }

        let aead = XChaCha20Poly1305::new_from_slice(&raw)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self { aead })
    }

    /// Load the key from `ENCRYPTION_KEY`, generating one if absent.
    pub fn from_env() -> Result<Self, CipherError> {
        Self::from_env_var(KEY_ENV_VAR)
    }

    /// Load the key from `name`.
    ///
    /// When the variable is unset a fresh key is generated and published back
    /// into the process environment so later lookups agree. A present but
    /// malformed key is an error.
    pub fn from_env_var(name: &str) -> Result<Self, CipherError> {
        match env::var(name) {
            Ok(encoded) => Self::from_key(&encoded),
            Err(VarError::NotPresent) => {
                let encoded = generate_key();
                env::set_var(name, &encoded);
                warn!(
                    env_var = %name,
                    "No encryption key configured, generated a new one; peers will not be able to decrypt"
                );
                Self::from_key(&encoded)
            }
            Err(VarError::NotUnicode(_)) => Err(CipherError::InvalidKey(format!(
                "{} is not valid unicode",
                name
            ))),
        }
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext").field("key", &"<redacted>").finish()
    }
}

/// Generate a fresh encoded key.
pub fn generate_key() -> String {
    let key = XChaCha20Poly1305::generate_key(&mut OsRng);
    let encoded = URL_SAFE.encode(key);
    info!("Generated new encryption key");
    encoded
}
