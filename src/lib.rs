//! Rust Transfer Engine Library
//! # Overview
//!
//! This library provides the ledger/transaction engine of a peer-to-peer money
//! transfer service: accounts with a balance in one currency, deposits from
//! external payment methods, and transfers between users with currency
//! conversion, all recorded in an append-only ledger.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Transaction, Currency, errors)
//! - [`core`] - Business logic components:
//!   - [`core::conversion`] - Currency conversion over a rate provider
//!   - [`core::account_store`] - Per-account locking and balance updates
//!   - [`core::ledger`] - Append-only transaction history
//!   - [`core::transfer`] / [`core::deposit`] - Operation orchestration
//!   - [`core::service`] - Boundary contract for the application layer
//! - [`io`] - Operation-script parsing, CSV output, durable journal
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`], [`config`], [`logging`] - Binary plumbing
//!
//! # Consistency
//!
//! A transfer's sufficiency check, debit, credit and ledger append happen while
//! both account locks are held, taken in ascending account-id order. A failed
//! operation leaves balances and the ledger untouched.
//!
//! # Numeric Semantics
//!
//! Amounts and balances carry two decimal places and exchange rates six;
//! conversion results are rounded half away from zero.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::{EngineConfig, ProvisioningPolicy};
pub use core::{DepositRequest, TransferRequest, TransferService};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, Currency, ErrorKind, PaymentError, Transaction, TransactionId,
    TransferMethod, UserId,
};
