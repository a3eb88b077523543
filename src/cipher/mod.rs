//! Symmetric payload cipher shared by a pair of relay instances.

pub mod context;
pub mod payload;
pub mod tree;

pub use context::{generate_key, CipherContext, KEY_ENV_VAR, KEY_LEN};
pub use payload::Decrypted;
pub use tree::{map_strings, DecryptReport};

use thiserror::Error;

use crate::error::RelayError;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("sealing failed: {0}")]
    Seal(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
}

impl From<CipherError> for RelayError {
    fn from(err: CipherError) -> Self {
        RelayError::Encryption(err.to_string())
    }
}
