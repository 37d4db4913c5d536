//! Account-related types for the transfer engine
//!
//! This module defines the Account structure held by the account store.

use super::currency::Currency;
use super::user::UserId;
use rust_decimal::Decimal;

/// Account identifier, assigned by the account store
pub type AccountId = u64;

/// A user's holding of funds in one currency
///
/// Accounts are created by the account store and only ever change through
/// its balance-update operations. Callers receive snapshots (clones).
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// The user owning this account (one account per owner)
    pub owner: UserId,

    /// Current balance in `currency`, two fractional digits, never negative
    pub balance: Decimal,

    /// Currency the balance is held in
    pub currency: Currency,

    /// Opaque, collision-free account number shown to users
    pub account_number: String,
}

impl Account {
    /// Create a new account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `id` - Store-assigned identifier
    /// * `owner` - Owning user
    /// * `currency` - Currency the account holds
    /// * `account_number` - Freshly generated account number
    pub fn new(id: AccountId, owner: UserId, currency: Currency, account_number: String) -> Self {
        Account {
            id,
            owner,
            balance: Decimal::new(0, 2),
            currency,
            account_number,
        }
    }
}
