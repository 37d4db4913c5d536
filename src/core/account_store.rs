//! Thread-safe account storage
//!
//! This module provides the `AccountStore`, the only owner of account records.
//! Accounts live behind per-account mutexes inside a `DashMap`, so operations
//! on different accounts never contend, and balance changes on the same
//! account are serialized.
//!
//! # Invariants
//!
//! - One account per owner, enforced by a unique owner index at write time
//! - Balances are never negative after a successful update
//! - Balances change only through the `update_*` operations
//!
//! # Locking
//!
//! Operations touching two accounts take both locks in ascending account-id
//! order, so two transfers in opposite directions cannot deadlock. Lock
//! acquisition is bounded: after `lock_attempts` failed tries the operation
//! gives up with [`PaymentError::Conflict`] instead of blocking forever.

use crate::config::DEFAULT_LOCK_ATTEMPTS;
use crate::types::money::round_amount;
use crate::types::{Account, AccountId, Currency, PaymentError, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::Duration;

/// Failed attempts between short sleeps while waiting for a lock
const SPINS_BEFORE_SLEEP: u32 = 64;

/// Thread-safe account store
///
/// Construct once and share through an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct AccountStore {
    /// Account records by id, each behind its own lock
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,

    /// Unique index: owner -> account id
    by_owner: DashMap<UserId, AccountId>,

    next_id: AtomicU64,

    lock_attempts: u32,
}

impl AccountStore {
    /// Create an empty store with the default lock bound
    pub fn new() -> Self {
        Self::with_lock_attempts(DEFAULT_LOCK_ATTEMPTS)
    }

    /// Create an empty store that gives up on a lock after `lock_attempts` tries
    pub fn with_lock_attempts(lock_attempts: u32) -> Self {
        Self {
            accounts: DashMap::new(),
            by_owner: DashMap::new(),
            next_id: AtomicU64::new(1),
            lock_attempts: lock_attempts.max(1),
        }
    }

    /// Snapshot of the account owned by `owner`, if any
    ///
    /// Never creates an account.
    pub fn get_account(&self, owner: UserId) -> Option<Account> {
        let id = *self.by_owner.get(&owner)?;
        self.get_by_id(id)
    }

    /// Snapshot of the account with the given id, if any
    pub fn get_by_id(&self, id: AccountId) -> Option<Account> {
        let cell = self.cell(id).ok()?;
        let guard = cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(guard.clone())
    }

    /// Allocate a zero-balance account for `owner`
    ///
    /// The account number is a random 128-bit UUID rendered as text.
    ///
    /// # Errors
    ///
    /// [`PaymentError::DuplicateAccount`] if the owner already holds one.
    pub fn create_account(&self, owner: UserId, currency: Currency) -> Result<Account, PaymentError> {
        match self.by_owner.entry(owner) {
            Entry::Occupied(_) => Err(PaymentError::DuplicateAccount { owner }),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let account = Account::new(id, owner, currency, uuid::Uuid::new_v4().to_string());
                self.accounts
                    .insert(id, Arc::new(Mutex::new(account.clone())));
                slot.insert(id);
                Ok(account)
            }
        }
    }

    /// Return the owner's account, creating it in `currency` if absent
    ///
    /// Safe under concurrent callers: exactly one account is created.
    pub fn get_or_create(&self, owner: UserId, currency: Currency) -> Result<Account, PaymentError> {
        if let Some(account) = self.get_account(owner) {
            return Ok(account);
        }
        match self.create_account(owner, currency) {
            Err(PaymentError::DuplicateAccount { .. }) => self
                .get_account(owner)
                .ok_or(PaymentError::NoAccountForUser { user: owner }),
            other => other,
        }
    }

    /// Replace the stored balance of an account
    ///
    /// # Errors
    ///
    /// - [`PaymentError::AccountNotFound`] if the id does not exist
    /// - [`PaymentError::NegativeBalance`] if `new_balance` is below zero
    /// - [`PaymentError::Conflict`] if the account lock could not be taken
    pub fn update_balance(&self, id: AccountId, new_balance: Decimal) -> Result<(), PaymentError> {
        self.update_balance_with(id, |_| Ok((new_balance, ())))
    }

    /// Compute and apply a new balance while holding the account lock
    ///
    /// `f` sees a consistent snapshot of the account and returns the new
    /// balance together with a result value. The balance is written only if
    /// `f` succeeds, so any error leaves the account untouched.
    pub fn update_balance_with<T, F>(&self, id: AccountId, f: F) -> Result<T, PaymentError>
    where
        F: FnOnce(&Account) -> Result<(Decimal, T), PaymentError>,
    {
        let cell = self.cell(id)?;
        let mut guard = self.acquire(id, &cell)?;

        let (new_balance, value) = f(&guard)?;
        guard.balance = checked_balance(id, new_balance)?;

        Ok(value)
    }

    /// Compute and apply new balances for two accounts as one unit
    ///
    /// Both locks are held while `f` runs; they are taken in ascending id
    /// order regardless of argument order. `f` receives the accounts in
    /// argument order and returns `(first_balance, second_balance, value)`.
    /// Nothing is written unless `f` succeeds and both balances are valid.
    ///
    /// # Errors
    ///
    /// [`PaymentError::SelfTransfer`] if both ids are the same account.
    pub fn update_pair_with<T, F>(
        &self,
        first: AccountId,
        second: AccountId,
        f: F,
    ) -> Result<T, PaymentError>
    where
        F: FnOnce(&Account, &Account) -> Result<(Decimal, Decimal, T), PaymentError>,
    {
        if first == second {
            return Err(PaymentError::SelfTransfer);
        }

        let first_cell = self.cell(first)?;
        let second_cell = self.cell(second)?;

        let (mut first_guard, mut second_guard) = if first < second {
            let a = self.acquire(first, &first_cell)?;
            let b = self.acquire(second, &second_cell)?;
            (a, b)
        } else {
            let b = self.acquire(second, &second_cell)?;
            let a = self.acquire(first, &first_cell)?;
            (a, b)
        };

        let (first_balance, second_balance, value) = f(&first_guard, &second_guard)?;
        let first_balance = checked_balance(first, first_balance)?;
        let second_balance = checked_balance(second, second_balance)?;

        first_guard.balance = first_balance;
        second_guard.balance = second_balance;

        Ok(value)
    }

    /// Snapshots of every account, ordered by id
    pub fn all_accounts(&self) -> Vec<Account> {
        let cells: Vec<Arc<Mutex<Account>>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts: Vec<Account> = cells
            .iter()
            .map(|cell| {
                cell.lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .clone()
            })
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// Clone the lock cell out of the map so no shard guard is held while locking
    fn cell(&self, id: AccountId) -> Result<Arc<Mutex<Account>>, PaymentError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PaymentError::AccountNotFound { account: id })
    }

    fn acquire<'a>(
        &self,
        id: AccountId,
        cell: &'a Mutex<Account>,
    ) -> Result<MutexGuard<'a, Account>, PaymentError> {
        for attempt in 1..=self.lock_attempts {
            match cell.try_lock() {
                Ok(guard) => return Ok(guard),
                // Balances are only written after validation succeeds, so a
                // poisoned account still holds a consistent value.
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if attempt % SPINS_BEFORE_SLEEP == 0 {
                        thread::sleep(Duration::from_micros(50));
                    } else {
                        thread::yield_now();
                    }
                }
            }
        }

        tracing::warn!(account = id, attempts = self.lock_attempts, "gave up waiting for account lock");
        Err(PaymentError::Conflict {
            account: id,
            attempts: self.lock_attempts,
        })
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn checked_balance(id: AccountId, balance: Decimal) -> Result<Decimal, PaymentError> {
    if balance < Decimal::ZERO {
        return Err(PaymentError::NegativeBalance {
            account: id,
            balance,
        });
    }
    Ok(round_amount(balance))
}
