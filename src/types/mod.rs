//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account record held by the account store
//! - `currency`: Supported currency codes
//! - `money`: Fixed-scale decimal helpers
//! - `transaction`: Ledger records and transfer metadata
//! - `user`: User records owned by the auth layer
//! - `error`: Error types for the transfer engine

pub mod account;
pub mod currency;
pub mod error;
pub mod money;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountId};
pub use currency::Currency;
pub use error::{ErrorKind, PaymentError};
pub use transaction::{
    NewTransaction, PaymentDetails, PickupLocation, Transaction, TransactionId, TransferMethod,
    DEFAULT_TRANSFER_DESCRIPTION,
};
pub use user::{User, UserId};
