//! Core traits for rate sourcing, ledger storage, and user lookup
//!
//! These are the seams where the engine meets its collaborators. The crate
//! ships in-process implementations of each; a real deployment can swap in a
//! live rate feed, a transactional ledger, or the auth subsystem's user table.

use crate::types::{
    AccountId, Currency, NewTransaction, PaymentError, Transaction, User, UserId,
};
use rust_decimal::Decimal;

/// Source of currency rates
///
/// Rates are expressed as units of the currency per one common base unit
/// (USD in the static table). Implementations must be safe to read
/// concurrently; the engine reads each rate once per operation.
pub trait RateProvider: Send + Sync {
    /// Units of `currency` per base unit, or `None` if the currency is not priced
    fn units_per_base(&self, currency: Currency) -> Option<Decimal>;
}

/// Append-only transaction history
pub trait Ledger: Send + Sync {
    /// Assign an id and creation timestamp, store the record, and return it
    ///
    /// Timestamps never decrease across calls. Durable implementations
    /// report write failures as [`PaymentError::PersistenceFailure`] and
    /// must not make a failed entry visible.
    fn append(&self, draft: NewTransaction) -> Result<Transaction, PaymentError>;

    /// Every transaction where `account` is the source or the destination,
    /// ascending by creation time, ties broken by id
    fn list_for_account(&self, account: AccountId) -> Vec<Transaction>;
}

/// Lookup of users owned by the authentication layer
pub trait UserDirectory: Send + Sync {
    /// Register a new user with a unique username
    fn register(&self, username: &str, credential_hash: &str) -> Result<User, PaymentError>;

    fn get(&self, id: UserId) -> Option<User>;

    fn find_by_username(&self, username: &str) -> Option<User>;
}
