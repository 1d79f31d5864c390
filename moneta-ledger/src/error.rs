use chrono::{DateTime, Utc};
use moneta_core::AccountId;
use thiserror::Error;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error type surfaced by ledger operations.
///
/// Storage failures abort the whole mutation; callers retry the entire
/// engine call, never a single step of it.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid ledger state: {0}")]
    InvalidState(String),
    #[error("out-of-order absolute sync for account {account}: {at} precedes watermark {watermark}")]
    OutOfOrderSync {
        account: AccountId,
        at: DateTime<Utc>,
        watermark: DateTime<Utc>,
    },
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}
