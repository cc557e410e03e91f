//! Retry and backoff policy for part transfers.
//!
//! Classifies remote failures (timeouts, dropped connections) and decides
//! exponential backoff so upload tasks share one consistent policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_io_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
