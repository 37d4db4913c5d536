//! Error types for the transfer engine
//!
//! This module defines every error the ledger, the engines, and the replay
//! tooling can produce. Each variant carries the context needed to explain the
//! failure, and [`PaymentError::kind`] folds them into a small taxonomy that
//! callers (HTTP handlers, the CLI) can branch on.
//!
//! # Error Categories
//!
//! - **NotFound**: missing user, recipient, or account
//! - **Validation**: malformed or non-positive amounts, unsupported currencies
//! - **InsufficientFunds**: kept apart from validation so clients can react to it
//! - **Conflict**: bounded lock acquisition exhausted
//! - **PersistenceFailure**: the durable ledger could not be written
//! - **Unauthenticated**: no resolved identity behind the request

use super::account::AccountId;
use super::user::UserId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`PaymentError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InsufficientFunds,
    Conflict,
    PersistenceFailure,
    Unauthenticated,
    Internal,
}

/// Main error type for the transfer engine
///
/// Validation and business-rule failures are returned to the immediate caller
/// as one of these variants; an operation that returns an error has not
/// changed any balance or ledger entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    /// Currency code outside the supported set
    #[error("Unsupported currency '{code}'")]
    UnsupportedCurrency {
        /// The rejected currency code
        code: String,
    },

    /// Amount is malformed, non-positive, or has more than two decimals
    #[error("Invalid amount '{amount}'")]
    InvalidAmount {
        /// The rejected amount as supplied
        amount: String,
    },

    /// The transfer amount is quoted in a currency other than the source account's
    #[error("Amount currency {actual} does not match account currency {expected}")]
    CurrencyMismatch {
        /// Currency of the requester's account
        expected: String,
        /// Currency the request was quoted in
        actual: String,
    },

    /// Source and destination resolve to the same account
    #[error("Cannot transfer to your own account")]
    SelfTransfer,

    /// A payment method needs a detail the request did not provide
    #[error("{method} deposit requires {field}")]
    MissingPaymentDetails {
        /// Payment method name
        method: String,
        /// Missing detail
        field: String,
    },

    /// The requester has no account to debit
    #[error("Source account not found for user {user}")]
    SourceAccountNotFound {
        /// Requesting user
        user: UserId,
    },

    /// No user with the given username
    #[error("Recipient '{username}' not found")]
    RecipientNotFound {
        /// Username that failed to resolve
        username: String,
    },

    /// The recipient exists but holds no account
    #[error("Recipient account not found for '{username}'")]
    RecipientAccountNotFound {
        /// Recipient username
        username: String,
    },

    /// No account with the given id
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Account id
        account: AccountId,
    },

    /// The user holds no account and provisioning is disabled
    #[error("No account found for user {user}")]
    NoAccountForUser {
        /// Owner id
        user: UserId,
    },

    /// No user is registered under the username
    #[error("User '{username}' not found")]
    UnknownUsername {
        /// Requested username
        username: String,
    },

    /// The owner already holds an account
    #[error("User {owner} already has an account")]
    DuplicateAccount {
        /// Owner id
        owner: UserId,
    },

    /// The username is empty or blank
    #[error("Invalid username '{username}'")]
    InvalidUsername {
        /// Rejected username
        username: String,
    },

    /// The username is already taken
    #[error("Username '{username}' is already taken")]
    DuplicateUser {
        /// Requested username
        username: String,
    },

    /// Balance is lower than the requested debit
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Source account id
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Requested debit
        requested: Decimal,
    },

    /// A balance update would leave the account below zero
    #[error("Balance {balance} for account {account} would be negative")]
    NegativeBalance {
        /// Account id
        account: AccountId,
        /// Rejected balance
        balance: Decimal,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },

    /// Lock acquisition gave up after the configured number of attempts
    #[error("Account {account} is busy, retry later ({attempts} attempts)")]
    Conflict {
        /// Contended account id
        account: AccountId,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// The durable ledger could not be written
    #[error("Failed to persist transaction: {message}")]
    PersistenceFailure {
        /// Description of the write failure
        message: String,
    },

    /// The caller has no resolved identity
    #[error("Authentication required")]
    Unauthenticated,

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for PaymentError {
    fn from(error: std::io::Error) -> Self {
        PaymentError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for PaymentError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        PaymentError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl PaymentError {
    /// Classify this error into the engine's taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::SourceAccountNotFound { .. }
            | PaymentError::RecipientNotFound { .. }
            | PaymentError::RecipientAccountNotFound { .. }
            | PaymentError::AccountNotFound { .. }
            | PaymentError::NoAccountForUser { .. }
            | PaymentError::UnknownUsername { .. }
            | PaymentError::FileNotFound { .. } => ErrorKind::NotFound,
            PaymentError::UnsupportedCurrency { .. }
            | PaymentError::InvalidAmount { .. }
            | PaymentError::CurrencyMismatch { .. }
            | PaymentError::SelfTransfer
            | PaymentError::MissingPaymentDetails { .. }
            | PaymentError::DuplicateAccount { .. }
            | PaymentError::InvalidUsername { .. }
            | PaymentError::DuplicateUser { .. }
            | PaymentError::ParseError { .. } => ErrorKind::Validation,
            PaymentError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            PaymentError::Conflict { .. } => ErrorKind::Conflict,
            PaymentError::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
            PaymentError::Unauthenticated => ErrorKind::Unauthenticated,
            PaymentError::NegativeBalance { .. }
            | PaymentError::ArithmeticOverflow { .. }
            | PaymentError::IoError { .. } => ErrorKind::Internal,
        }
    }

    /// Message suitable for showing to an end user
    ///
    /// Internal failures collapse to a generic message so account ids and
    /// balances never leak through them.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal | ErrorKind::PersistenceFailure => {
                "The operation could not be completed, please try again later".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }
}

// Helper functions for creating common errors

impl PaymentError {
    /// Create an UnsupportedCurrency error
    pub fn unsupported_currency(code: &str) -> Self {
        PaymentError::UnsupportedCurrency {
            code: code.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: &str) -> Self {
        PaymentError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        PaymentError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create a MissingPaymentDetails error
    pub fn missing_payment_details(method: &str, field: &str) -> Self {
        PaymentError::MissingPaymentDetails {
            method: method.to_string(),
            field: field.to_string(),
        }
    }

    /// Create a RecipientNotFound error
    pub fn recipient_not_found(username: &str) -> Self {
        PaymentError::RecipientNotFound {
            username: username.to_string(),
        }
    }

    /// Create a RecipientAccountNotFound error
    pub fn recipient_account_not_found(username: &str) -> Self {
        PaymentError::RecipientAccountNotFound {
            username: username.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        PaymentError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create a PersistenceFailure error
    pub fn persistence_failure(message: impl Into<String>) -> Self {
        PaymentError::PersistenceFailure {
            message: message.into(),
        }
    }
}
