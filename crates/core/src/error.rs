//! Ledger error model.

use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Keep this focused on deterministic domain failures. Everything below the
/// executor boundary is converted into a typed outcome on the transfer
/// rather than thrown past the API boundary; only malformed input
/// (`Validation`/`InvalidId`) fails fast at submission time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed input (missing fields, empty identifiers).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record or transfer was not found.
    #[error("not found")]
    NotFound,

    /// Business rejection: the source cannot cover the requested quantity.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// An illegal state transition or stale-state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A mutation unit was not acquired within the configured bound.
    #[error("lock acquisition timed out: {0}")]
    ConcurrencyTimeout(String),

    /// Conservation audit discrepancy. Fatal; never auto-corrected.
    #[error("integrity fault: {0}")]
    IntegrityFault(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::ConcurrencyTimeout(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityFault(msg.into())
    }

    /// Business rejections are surfaced on the transfer as `rejected`;
    /// everything else that reaches the executor becomes `failed`.
    pub fn is_business_rejection(&self) -> bool {
        matches!(self, Self::InsufficientStock(_))
    }
}
