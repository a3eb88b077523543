//! HTTP relay library.
//!
//! Forwards caller-described HTTP requests to an upstream, optionally
//! encrypting the request fields and decrypting the response for a peer
//! relay holding the same key.

// Pipeline
pub mod cipher;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod relay;

// Inbound surface
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use cipher::CipherContext;
pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use model::{RequestSpec, ResponseEnvelope};
pub use relay::{ForwardOptions, Relay};
