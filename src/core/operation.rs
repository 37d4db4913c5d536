//! Replayable operations
//!
//! An `Operation` is one line of an operation script, already parsed and
//! addressed by username. Applying it resolves the username through the
//! service's user directory and then calls the matching boundary operation.

use crate::core::deposit::DepositRequest;
use crate::core::service::TransferService;
use crate::core::transfer::TransferRequest;
use crate::types::{Currency, PaymentError, UserId};

/// Credential recorded for users created by replay; matches no password
pub const REPLAY_CREDENTIAL: &str = "!";

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Register a user and open their account
    Register {
        username: String,
        currency: Option<Currency>,
    },

    /// Deposit into the user's own account
    Deposit {
        username: String,
        request: DepositRequest,
    },

    /// Transfer from the user to `request.to_username`
    Transfer {
        username: String,
        request: TransferRequest,
    },
}

impl Operation {
    /// Username the operation acts for
    pub fn username(&self) -> &str {
        match self {
            Operation::Register { username, .. }
            | Operation::Deposit { username, .. }
            | Operation::Transfer { username, .. } => username,
        }
    }

    /// Other user touched by the operation, if any
    pub fn counterparty(&self) -> Option<&str> {
        match self {
            Operation::Transfer { request, .. } => Some(&request.to_username),
            _ => None,
        }
    }

    /// Apply the operation to `service`
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when the acting username is not registered, or any
    /// error from the underlying service operation.
    pub fn apply(&self, service: &TransferService) -> Result<(), PaymentError> {
        match self {
            Operation::Register { username, currency } => {
                let user = service.register_user(username, REPLAY_CREDENTIAL)?;
                service.open_account(user.id, *currency)?;
            }
            Operation::Deposit { username, request } => {
                let user = resolve(service, username)?;
                service.execute_deposit(user, request)?;
            }
            Operation::Transfer { username, request } => {
                let user = resolve(service, username)?;
                service.execute_transfer(user, request)?;
            }
        }
        Ok(())
    }
}

fn resolve(service: &TransferService, username: &str) -> Result<UserId, PaymentError> {
    service
        .users()
        .find_by_username(username)
        .map(|user| user.id)
        .ok_or(PaymentError::Unauthenticated)
}
