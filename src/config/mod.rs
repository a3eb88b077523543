//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via ArcSwap with the HTTP layer
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RelayConfig>
//!     → next request observes new defaults
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A reload that fails validation keeps the running configuration
//! - The cipher key is read once at startup and never reloaded

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    CipherConfig, ListenerConfig, LogFormat, ObservabilityConfig, RelayConfig, RetryConfig,
    SecurityConfig, TimeoutConfig,
};
pub use watcher::ConfigWatcher;
