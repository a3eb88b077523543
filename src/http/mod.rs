//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, limits)
//!     → request.rs (parse body, encryption toggle, resolve options)
//!     → relay pipeline
//!     → ResponseEnvelope or {status_code, detail} as JSON
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RelayRequest, RelayRequestId, RetryOverride, X_REQUEST_ID};
pub use response::HealthResponse;
pub use server::{AppState, HttpServer};
