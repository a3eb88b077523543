//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, the cipher key and metrics in dependency order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Logging comes up before the key so a generated key is announced

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::cipher::{CipherContext, CipherError};
use crate::config::{load_or_default, ConfigError, RelayConfig};
use crate::observability::{init_logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
}

/// Everything the server needs, initialized.
#[derive(Debug)]
pub struct Bootstrap {
    pub config: RelayConfig,
    pub config_path: Option<PathBuf>,
    pub cipher: Arc<CipherContext>,
}

/// Bring up configuration, logging, the cipher and metrics.
pub fn bootstrap(config_path: Option<&Path>) -> Result<Bootstrap, StartupError> {
    let config = load_or_default(config_path)?;
    init_logging(&config.observability).map_err(StartupError::Logging)?;

    tracing::info!(
        config_path = ?config_path,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );

    let cipher = Arc::new(CipherContext::from_env_var(&config.cipher.key_env)?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    Ok(Bootstrap {
        config,
        config_path: config_path.map(Path::to_path_buf),
        cipher,
    })
}
