//! Core business logic module
//!
//! This module contains the ledger/transaction engine:
//! - `traits` - Seams for rate sourcing, ledger storage, and user lookup
//! - `conversion` - Currency conversion over a rate provider
//! - `account_store` - Account records and atomic balance updates
//! - `ledger` - Append-only in-memory transaction history
//! - `users` - In-process user directory
//! - `transfer` - Transfer orchestration between two accounts
//! - `deposit` - Deposit orchestration into one account
//! - `service` - Boundary contract for the application layer
//! - `operation` - Replayable operations applied to the service

pub mod account_store;
pub mod conversion;
pub mod deposit;
pub mod ledger;
pub mod operation;
pub mod service;
pub mod traits;
pub mod transfer;
pub mod users;

pub use account_store::AccountStore;
pub use conversion::{CurrencyConverter, StaticRates};
pub use deposit::{DepositEngine, DepositRequest};
pub use ledger::InMemoryLedger;
pub use operation::Operation;
pub use service::{AccountSummary, TransferService};
pub use traits::{Ledger, RateProvider, UserDirectory};
pub use transfer::{TransferEngine, TransferRequest};
pub use users::InMemoryUserDirectory;
