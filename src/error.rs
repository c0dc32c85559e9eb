//! Error types for aplus
//!
//! Only misuse of the API is reported through [`Error`]. A task's own failure
//! is the caller's error type and comes back from a run untouched.

use thiserror::Error;

/// aplus usage errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Task collection has a shape the iterator cannot reassemble
    ///
    /// **Triggered by:** Building a keyed collection from pairs that repeat a key
    /// **Example:** `TaskCollection::keyed([("a", t1), ("a", t2)])`
    /// **Prevention:** Keys identify result slots, so each may appear only once
    #[error("Invalid input kind: {reason}")]
    InvalidInputKind {
        /// What is wrong with the input
        reason: String,
    },

    /// Concurrency limit outside the accepted range
    ///
    /// **Triggered by:** Asking for a limited run with a limit of zero
    /// **Example:** `parallel_limit(tasks, 0)`
    /// **Prevention:** Use `series` for one-at-a-time, `parallel` for no cap
    #[error("Invalid concurrency limit: {0} (must be at least 1)")]
    InvalidLimit(usize),
}

impl Error {
    /// Create an input-kind error with a reason
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInputKind {
            reason: reason.into(),
        }
    }
}

/// Result type for aplus operations
pub type Result<T> = std::result::Result<T, Error>;
