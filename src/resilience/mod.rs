//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed attempt (error status or transport failure):
//!     → backoff.rs (delay = backoff_factor * 2^attempt)
//!     → sleep.rs (wait, or record the delay under test)
//!     → next attempt, until max_retries is spent
//! ```
//!
//! # Design Decisions
//! - No jitter; delays are reproducible from the policy alone
//! - Waiting goes through a trait so tests never touch the wall clock

pub mod backoff;
pub mod sleep;

pub use backoff::{calculate_backoff, RetryPolicy};
pub use sleep::{RecordingSleeper, Sleeper, TokioSleeper};
