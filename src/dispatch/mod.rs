//! Outbound request dispatch.
//!
//! # Data Flow
//! ```text
//! RequestSpec
//!     → dispatcher.rs (attempt loop, retry classification, backoff)
//!     → transport.rs (single HTTP exchange, per-attempt timeout)
//!     → RawResponse
//! ```

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{DispatchOptions, Dispatcher};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
