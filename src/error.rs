use crate::domain::account::{AccountId, Balance, UserId};
use crate::domain::transfer::{Amount, TransferId};
use std::time::Duration;
use thiserror::Error;

/// Broad category of a [`LedgerError`].
///
/// The boundary layer decides how each kind is surfaced (exit code, status
/// code, message). Insufficient funds is its own kind, never a validation
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unprocessable,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("User {0} not found")]
    UserNotFound(UserId),
    #[error("Account name '{name}' already exists for user {user_id}")]
    DuplicateAccountName { user_id: UserId, name: String },
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Balance,
        requested: Amount,
    },
    #[error("Balance overflow in account {0}")]
    BalanceOverflow(AccountId),
    #[error("Ledger sequence conflict: expected next transfer {expected}, found {found}")]
    SequenceConflict {
        expected: TransferId,
        found: TransferId,
    },
    #[error("Transfer timed out after {0:?}")]
    TimedOut(Duration),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] serde_yaml::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps an arbitrary message as an internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::ValidationError(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_) | LedgerError::UserNotFound(_) => ErrorKind::NotFound,
            LedgerError::DuplicateAccountName { .. } => ErrorKind::Conflict,
            LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow(_) => {
                ErrorKind::Unprocessable
            }
            LedgerError::CsvError(_) => ErrorKind::Validation,
            LedgerError::SequenceConflict { .. }
            | LedgerError::TimedOut(_)
            | LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::ConfigError(_)
            | LedgerError::InternalError(_) => ErrorKind::Internal,
            #[cfg(feature = "storage-rocksdb")]
            LedgerError::StorageError(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_is_not_validation() {
        let err = LedgerError::InsufficientFunds {
            account: AccountId(1),
            balance: Balance::ZERO,
            requested: Amount::new(5).unwrap(),
        };
        assert_eq!(err.kind(), ErrorKind::Unprocessable);
        assert_ne!(
            err.kind(),
            LedgerError::ValidationError("x".to_string()).kind()
        );
    }

    #[test]
    fn test_not_found_names_the_account() {
        let err = LedgerError::AccountNotFound(AccountId(9999));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Account 9999 not found");
    }

    #[test]
    fn test_internal_helper() {
        let err = LedgerError::internal("column family missing");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("column family missing"));
    }
}
