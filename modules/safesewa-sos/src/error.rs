use thiserror::Error;

use safesewa_common::{SosStatus, StoreError};

/// Errors surfaced synchronously to SOS callers. State-machine violations
/// are never silently dropped.
#[derive(Debug, Error)]
pub enum SosError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session not found")]
    NotFound,

    /// Operation not legal from the session's current status.
    #[error("cannot {op} a session in status {from}")]
    InvalidTransition { from: SosStatus, op: &'static str },

    /// Lost a first-writer-wins race (session already claimed).
    #[error("session already accepted by another volunteer")]
    Conflict,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SosError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}
