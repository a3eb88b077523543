//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (reject oversized bodies with 413)
//!     → handler
//! Outgoing response:
//!     → headers.rs (add security response headers)
//! ```

pub mod headers;
pub mod limits;

pub use headers::apply_security_headers;
pub use limits::apply_body_limit;
