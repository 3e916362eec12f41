//! Error taxonomy for the ledger and its projections.

use thiserror::Error;

/// Errors raised by [`crate::storage::EventLog`] implementations and by write
/// policy enforcement.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("event not found: {0}")]
    NotFound(i64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("initialization error: {0}")]
    Init(String),

    #[error("write rejected by policy: {0}")]
    Policy(#[from] crate::policy::PolicyError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
