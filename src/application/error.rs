use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Amount, UserId};
use crate::lock::LockError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("User {user_id} does not own account {account_number}")]
    UserAccountMismatch {
        user_id: UserId,
        account_number: String,
    },

    #[error("Transaction {transaction_id} did not occur on account {account_number}")]
    TransactionAccountMismatch {
        transaction_id: String,
        account_number: String,
    },

    #[error("Account is already closed: {0}")]
    AlreadyUnregistered(String),

    #[error("Account {account_number} still holds a balance of {balance}")]
    ExistsBalance {
        account_number: String,
        balance: Amount,
    },

    #[error("Amount {requested} exceeds balance {balance} on account {account_number}")]
    AmountExceedsBalance {
        account_number: String,
        balance: Amount,
        requested: Amount,
    },

    #[error("Partial cancellation is not allowed: original amount {original}, requested {requested}")]
    CancelMustBeFull { original: Amount, requested: Amount },

    #[error("Transactions older than one year cannot be cancelled (transacted at {transacted_at})")]
    TooOldToCancel { transacted_at: DateTime<Utc> },

    #[error("A user may hold at most 10 active accounts (user {0})")]
    MaxAccountsPerUser(UserId),

    #[error("Account {0} is in use by another transaction")]
    AccountTransactionLock(String),

    #[error("A user with the same private number already exists: {0}")]
    DuplicatePrivateNumber(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable identifier for each error kind. Transport
    /// layers map these to response codes.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UserNotFound(_) => "USER_NOT_FOUND",
            AppError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            AppError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            AppError::UserAccountMismatch { .. } => "USER_ACCOUNT_UN_MATCH",
            AppError::TransactionAccountMismatch { .. } => "TRANSACTION_ACCOUNT_UN_MATCH",
            AppError::AlreadyUnregistered(_) => "ALREADY_UNREGISTERED",
            AppError::ExistsBalance { .. } => "EXISTS_BALANCE",
            AppError::AmountExceedsBalance { .. } => "AMOUNT_EXCEED_BALANCE",
            AppError::CancelMustBeFull { .. } => "CANCEL_MUST_FULLY",
            AppError::TooOldToCancel { .. } => "TOO_OLD_ORDER_TO_CANCEL",
            AppError::MaxAccountsPerUser(_) => "MAX_ACCOUNT_PER_USER_10",
            AppError::AccountTransactionLock(_) => "ACCOUNT_TRANSACTION_LOCK",
            AppError::DuplicatePrivateNumber(_) => "EXIST_SAME_PRIVATE_NUMBER",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Database(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Unavailable(key) => AppError::AccountTransactionLock(key),
        }
    }
}
