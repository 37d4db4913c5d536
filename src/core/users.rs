//! In-process user directory
//!
//! Stands in for the authentication subsystem: usernames are unique, ids are
//! assigned sequentially, and lookups go through a username index rather than
//! a scan.

use crate::core::traits::UserDirectory;
use crate::types::{PaymentError, User, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
    by_username: DashMap<String, UserId>,
    next_id: AtomicU64,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_username: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn register(&self, username: &str, credential_hash: &str) -> Result<User, PaymentError> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(PaymentError::InvalidUsername {
                username: username.to_string(),
            });
        }
        let username = trimmed;

        match self.by_username.entry(username.to_string()) {
            Entry::Occupied(_) => Err(PaymentError::DuplicateUser {
                username: username.to_string(),
            }),
            Entry::Vacant(slot) => {
                let user = User {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    username: username.to_string(),
                    credential_hash: credential_hash.to_string(),
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    fn get(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        let id = *self.by_username.get(username.trim())?;
        self.get(id)
    }
}
