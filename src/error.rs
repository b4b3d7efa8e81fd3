//! Crate-wide error type for the data-access layer.

use thiserror::Error;

/// Errors surfaced by the ledger data-access layer.
///
/// `StorageUnavailable` wraps the underlying sqlx error unchanged; retry
/// policy, if any, belongs to the caller. `InvalidOwner` and
/// `UnknownOwnerKind` are caller mistakes and are returned before any query
/// is issued.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction store unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("invalid owner: {0}")]
    InvalidOwner(String),

    #[error("unknown owner kind tag `{0}`")]
    UnknownOwnerKind(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
