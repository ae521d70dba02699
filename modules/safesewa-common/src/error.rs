//! Typed errors shared across the core.

use thiserror::Error;

/// Errors from the external record store.
///
/// `Conflict` doubles as both the fingerprint-uniqueness backstop on alert
/// inserts and the failed-precondition outcome of a conditional session
/// update (first-writer-wins).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store unreachable or the operation failed; the caller must treat the
    /// operation as failed, never as silently applied.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness or expected-status precondition did not hold.
    #[error("conflicting write")]
    Conflict,

    /// Referenced record does not exist.
    #[error("record not found")]
    NotFound,
}

/// Whole-fetch failures from a source adapter. Recoverable: the scheduler
/// logs them and waits for the next tick. Row-level parse failures are not
/// errors at all; adapters skip the row and continue.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("timed out fetching {0}")]
    Timeout(String),

    #[error("unparseable payload: {0}")]
    Parse(String),
}
