//! CSV format handling for operation scripts and engine output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization of operation scripts
//! - Conversion from CSV records to [`Operation`]s
//! - Account balance and per-user statement serialization
//!
//! All functions are pure (no I/O beyond the supplied writer) for easy testing.

use crate::core::{AccountSummary, DepositRequest, Operation, TransferRequest};
use crate::types::{
    Currency, PaymentDetails, PaymentError, PickupLocation, Transaction, TransferMethod,
};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the script format with columns:
/// `type,user,counterparty,amount,currency,method,card,bank,description,pickup`.
/// Everything after `user` is optional; which columns an operation needs
/// depends on its type.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub user: String,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub method: Option<String>,
    pub card: Option<String>,
    pub bank: Option<String>,
    pub description: Option<String>,
    pub pickup: Option<String>,
}

/// Convert a CsvRecord to an Operation
///
/// This function:
/// - Parses the operation type (`register`, `deposit`, `transfer`)
/// - Parses currency, transfer method, and pickup location columns
/// - Checks that each operation type has the columns it needs
///
/// Amounts are passed through as text; the engines validate them so that a
/// bad amount is reported as `InvalidAmount` like any other caller's.
///
/// # Returns
///
/// * `Ok(Operation)` - Successfully converted record
/// * `Err(PaymentError::ParseError)` - Missing or unparsable column
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<Operation, PaymentError> {
    let username = csv_record.user.trim().to_string();
    if username.is_empty() {
        return Err(parse_error("operation requires a user"));
    }

    let currency = present(csv_record.currency)
        .map(|code| code.parse::<Currency>())
        .transpose()?;
    let method = present(csv_record.method)
        .map(|method| method.parse::<TransferMethod>())
        .transpose()?;

    match csv_record.op_type.trim().to_lowercase().as_str() {
        "register" => Ok(Operation::Register { username, currency }),
        "deposit" => {
            let amount = required(csv_record.amount, "deposit", "amount")?;
            let currency =
                currency.ok_or_else(|| parse_error("deposit requires a currency"))?;

            Ok(Operation::Deposit {
                username,
                request: DepositRequest {
                    amount,
                    currency,
                    transfer_method: method.unwrap_or(TransferMethod::Cash),
                    details: PaymentDetails {
                        card_number: present(csv_record.card),
                        bank_name: present(csv_record.bank),
                        ..Default::default()
                    },
                },
            })
        }
        "transfer" => {
            let to_username = required(csv_record.counterparty, "transfer", "counterparty")?;
            let amount = required(csv_record.amount, "transfer", "amount")?;
            let pickup_location = present(csv_record.pickup)
                .map(|location| location.parse::<PickupLocation>())
                .transpose()?;

            Ok(Operation::Transfer {
                username,
                request: TransferRequest {
                    to_username,
                    amount,
                    currency,
                    description: present(csv_record.description),
                    transfer_method: method,
                    pickup_location,
                },
            })
        }
        other => Err(parse_error(format!(
            "Invalid operation type '{}' for user {}",
            other, username
        ))),
    }
}

/// Write account balances in CSV format
///
/// Columns: user, balance, currency. Rows are sorted by username for
/// deterministic output and balances are printed at two decimals.
pub fn write_accounts_csv(
    accounts: &[AccountSummary],
    output: &mut dyn Write,
) -> Result<(), PaymentError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["user", "balance", "currency"])?;

    let mut sorted = accounts.to_vec();
    sorted.sort_by(|a, b| a.username.cmp(&b.username));

    for summary in sorted {
        writer.write_record(&[
            summary.username,
            format!("{:.2}", summary.account.balance),
            summary.account.currency.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a transaction statement in CSV format, in the order given
///
/// Columns: id, from, to, amount, from_currency, to_currency, exchange_rate,
/// method, description.
///
/// `id`, `from` and `to` are engine-assigned transaction and account ids.
/// Async replay registers unrelated users concurrently, so these ids can
/// differ from a sync replay of the same script; row order and every other
/// column are the same under both strategies.
pub fn write_statement_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), PaymentError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "id",
        "from",
        "to",
        "amount",
        "from_currency",
        "to_currency",
        "exchange_rate",
        "method",
        "description",
    ])?;

    for tx in transactions {
        writer.write_record(&[
            tx.id.to_string(),
            tx.from_account.to_string(),
            tx.to_account.to_string(),
            format!("{:.2}", tx.amount),
            tx.from_currency.to_string(),
            tx.to_currency.to_string(),
            format!("{:.6}", tx.exchange_rate),
            tx.transfer_method
                .map(|method| method.to_string())
                .unwrap_or_default(),
            tx.description.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// A column value with visible characters, trimmed
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, op: &str, column: &str) -> Result<String, PaymentError> {
    present(value).ok_or_else(|| parse_error(format!("{} requires {}", op, column)))
}

fn parse_error(message: impl Into<String>) -> PaymentError {
    PaymentError::ParseError {
        line: None,
        message: message.into(),
    }
}
