//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level at startup
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber.
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), String> {
    let filter = create_env_filter(&config.log_level)?;

    match config.log_format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| format!("Failed to initialize logging: {}", e))?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| format!("Failed to initialize logging: {}", e))?;
        }
    }

    tracing::debug!(level = %config.log_level, format = ?config.log_format, "Logging initialized");
    Ok(())
}

fn create_env_filter(level: &str) -> Result<EnvFilter, String> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            let directives = format!("{},tower_http=info", level);
            EnvFilter::try_new(&directives)
                .map_err(|e| format!("Invalid log level '{}': {}", level, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(create_env_filter("debug").is_ok());
            assert!(create_env_filter("http_relay=trace").is_ok());
        }
    }
}
