//! Error types for the points ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every variant is a stable, inspectable kind: presentation layers map
/// variants to user-facing text without string-matching. A failed
/// mutation never leaves partial state behind.
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is non-positive or outside the configured bounds.
    /// Rejected before any store access.
    #[error("Invalid amount {amount}: must be between {min} and {max}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
        /// Policy lower bound
        min: i64,
        /// Policy upper bound
        max: i64,
    },

    /// REMOVE would breach the non-negative balance policy.
    /// Rejected before any write.
    #[error("Insufficient balance: have {balance}, tried to remove {requested}")]
    InsufficientBalance {
        /// Balance at the time of the check
        balance: i64,
        /// Requested debit amount
        requested: i64,
    },

    /// The mutation would push the balance outside the representable
    /// range. Rejected before any write.
    #[error("Balance overflow: {balance} with delta {delta} is out of range")]
    Overflow {
        /// Balance at the time of the check
        balance: i64,
        /// Signed delta the mutation would have applied
        delta: i64,
    },

    /// Underlying store unreachable or the atomic commit failed.
    /// No partial state; the caller may retry.
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl Error {
    /// Whether the caller may retry the same request unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(Error::Storage("down".to_string()).is_transient());
        assert!(!Error::InsufficientBalance {
            balance: 10,
            requested: 15
        }
        .is_transient());
        assert!(!Error::InvalidAmount {
            amount: 0,
            min: 1,
            max: 100
        }
        .is_transient());
    }
}
