//! Transaction-related types for the transfer engine
//!
//! This module defines the immutable ledger record, the draft the engines hand
//! to the ledger, and the small enumerations describing how money moved.

use super::account::AccountId;
use super::currency::Currency;
use super::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Transaction identifier, assigned by the ledger
pub type TransactionId = u64;

/// Description used when a transfer carries none
pub const DEFAULT_TRANSFER_DESCRIPTION: &str = "Transfer";

/// Rail the money moved over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMethod {
    /// Bank wire or account-to-account transfer
    BankTransfer,

    /// Card payment
    CreditCard,

    /// Cash, optionally collected at a pickup location
    Cash,
}

impl TransferMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMethod::BankTransfer => "bank_transfer",
            TransferMethod::CreditCard => "credit_card",
            TransferMethod::Cash => "cash",
        }
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank_transfer" => Ok(TransferMethod::BankTransfer),
            "credit_card" => Ok(TransferMethod::CreditCard),
            "cash" => Ok(TransferMethod::Cash),
            other => Err(PaymentError::ParseError {
                line: None,
                message: format!("Unknown transfer method '{}'", other),
            }),
        }
    }
}

/// Cash pickup location for cash transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickupLocation {
    Damascus,
    Aleppo,
    RifDimashk,
    Lattakia,
    Homs,
}

impl PickupLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupLocation::Damascus => "Damascus",
            PickupLocation::Aleppo => "Aleppo",
            PickupLocation::RifDimashk => "Rif-Dimashk",
            PickupLocation::Lattakia => "Lattakia",
            PickupLocation::Homs => "Homs",
        }
    }
}

impl fmt::Display for PickupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickupLocation {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "damascus" => Ok(PickupLocation::Damascus),
            "aleppo" => Ok(PickupLocation::Aleppo),
            "rif-dimashk" => Ok(PickupLocation::RifDimashk),
            "lattakia" => Ok(PickupLocation::Lattakia),
            "homs" => Ok(PickupLocation::Homs),
            other => Err(PaymentError::ParseError {
                line: None,
                message: format!("Unknown pickup location '{}'", other),
            }),
        }
    }
}

/// Payment credentials supplied with a deposit
///
/// Only the bank name and the last four card digits ever reach the ledger;
/// the rest is used for validation and then dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub expiry_date: Option<String>,
    pub cvv: Option<String>,
    pub bank_name: Option<String>,
    pub swift_code: Option<String>,
}

impl PaymentDetails {
    /// Last four digits of the card number, ignoring spaces and dashes
    pub fn masked_card(&self) -> Option<String> {
        let digits: Vec<char> = self
            .card_number
            .as_deref()?
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();

        if digits.len() < 4 {
            return None;
        }
        Some(digits[digits.len() - 4..].iter().collect())
    }

    /// Bank name, if one with visible characters was given
    pub fn bank(&self) -> Option<&str> {
        self.bank_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// A transaction before the ledger has assigned its id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub from_account: AccountId,
    pub to_account: AccountId,
    /// Amount in the source currency
    pub amount: Decimal,
    pub from_currency: Currency,
    pub to_currency: Currency,
    /// Source to target multiplier, six fractional digits
    pub exchange_rate: Decimal,
    pub description: String,
    pub transfer_method: Option<TransferMethod>,
    pub pickup_location: Option<PickupLocation>,
}

/// Immutable ledger record of a completed transfer or deposit
///
/// For a deposit `from_account == to_account`, `from_currency` is the
/// deposited currency and `to_currency` the account's currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Decimal,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub exchange_rate: Decimal,
    pub description: String,
    pub transfer_method: Option<TransferMethod>,
    pub pickup_location: Option<PickupLocation>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Stamp a draft with its ledger identity
    pub fn from_new(id: TransactionId, created_at: DateTime<Utc>, draft: NewTransaction) -> Self {
        Transaction {
            id,
            from_account: draft.from_account,
            to_account: draft.to_account,
            amount: draft.amount,
            from_currency: draft.from_currency,
            to_currency: draft.to_currency,
            exchange_rate: draft.exchange_rate,
            description: draft.description,
            transfer_method: draft.transfer_method,
            pickup_location: draft.pickup_location,
            created_at,
        }
    }

    /// Whether the account is the source or the destination
    pub fn involves(&self, account: AccountId) -> bool {
        self.from_account == account || self.to_account == account
    }

    /// Whether this record is a deposit into a single account
    pub fn is_deposit(&self) -> bool {
        self.from_account == self.to_account
    }
}
