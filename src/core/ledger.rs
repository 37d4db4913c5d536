//! In-memory transaction ledger
//!
//! This module provides the `InMemoryLedger`, an append-only store of
//! completed transfers and deposits with an index from account to the
//! transactions that touch it.
//!
//! # Ordering
//!
//! Ids and creation timestamps are handed out together by a small sequencer,
//! so both grow monotonically across appends. If the wall clock steps back the
//! previous timestamp is reused; ties are resolved by id when listing.
//!
//! # Concurrency
//!
//! Appends coordinate only on the sequencer. Records and the per-account index
//! live in `DashMap`s, so concurrent appends for unrelated accounts do not
//! contend on anything else.

use crate::core::traits::Ledger;
use crate::types::{AccountId, NewTransaction, PaymentError, Transaction, TransactionId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;

#[derive(Debug)]
struct Sequencer {
    next_id: TransactionId,
    last_stamp: DateTime<Utc>,
}

impl Sequencer {
    fn next(&mut self) -> (TransactionId, DateTime<Utc>) {
        let id = self.next_id;
        self.next_id += 1;

        let now = Utc::now();
        if now > self.last_stamp {
            self.last_stamp = now;
        }
        (id, self.last_stamp)
    }
}

/// Append-only ledger held in memory
#[derive(Debug)]
pub struct InMemoryLedger {
    sequencer: Mutex<Sequencer>,

    /// Transaction records by id
    entries: DashMap<TransactionId, Transaction>,

    /// Account -> ids of transactions where it is source or destination
    by_account: DashMap<AccountId, Vec<TransactionId>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            sequencer: Mutex::new(Sequencer {
                next_id: 1,
                last_stamp: DateTime::<Utc>::MIN_UTC,
            }),
            entries: DashMap::new(),
            by_account: DashMap::new(),
        }
    }

    /// Assign the next id and timestamp to a draft without storing it
    ///
    /// Used by durable wrappers that must persist a record before it becomes
    /// visible. An id consumed by a record that is never inserted leaves a gap.
    pub fn stamp(&self, draft: NewTransaction) -> Transaction {
        let (id, created_at) = self
            .sequencer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .next();
        Transaction::from_new(id, created_at, draft)
    }

    /// Make a stamped record visible
    pub fn insert(&self, transaction: Transaction) {
        self.by_account
            .entry(transaction.from_account)
            .or_default()
            .push(transaction.id);
        if !transaction.is_deposit() {
            self.by_account
                .entry(transaction.to_account)
                .or_default()
                .push(transaction.id);
        }
        self.entries.insert(transaction.id, transaction);
    }

    /// Look up a single transaction
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of stored transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for InMemoryLedger {
    fn append(&self, draft: NewTransaction) -> Result<Transaction, PaymentError> {
        let transaction = self.stamp(draft);
        self.insert(transaction.clone());
        Ok(transaction)
    }

    fn list_for_account(&self, account: AccountId) -> Vec<Transaction> {
        let ids = match self.by_account.get(&account) {
            Some(ids) => ids.value().clone(),
            None => return Vec::new(),
        };

        let mut transactions: Vec<Transaction> =
            ids.iter().filter_map(|id| self.get(*id)).collect();
        transactions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        transactions
    }
}
