//! Deposit processing engine
//!
//! This module provides the `DepositEngine`, which credits a user's own
//! account from an external payment method. Deposits are credited
//! immediately; there is no pending-settlement state.
//!
//! The amount is converted into the account's currency, the balance is
//! updated and the ledger entry appended while the account lock is held, so
//! a failed append leaves the balance untouched.
//!
//! Card numbers are reduced to their last four digits before they reach the
//! ledger description. Expiry dates and CVVs are never recorded.

use crate::config::ProvisioningPolicy;
use crate::core::account_store::AccountStore;
use crate::core::conversion::CurrencyConverter;
use crate::core::traits::Ledger;
use crate::types::money::parse_amount;
use crate::types::{
    Account, Currency, NewTransaction, PaymentDetails, PaymentError, Transaction, TransferMethod,
    UserId,
};
use std::sync::Arc;

/// A request to add funds from an external payment method
#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    /// Amount as supplied by the caller, in `currency`
    pub amount: String,
    pub currency: Currency,
    pub transfer_method: TransferMethod,
    pub details: PaymentDetails,
}

/// Orchestrates deposits into a single account
#[derive(Clone)]
pub struct DepositEngine {
    accounts: Arc<AccountStore>,
    ledger: Arc<dyn Ledger>,
    converter: CurrencyConverter,
    default_currency: Currency,
    provisioning: ProvisioningPolicy,
}

impl DepositEngine {
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<dyn Ledger>,
        converter: CurrencyConverter,
        default_currency: Currency,
        provisioning: ProvisioningPolicy,
    ) -> Self {
        Self {
            accounts,
            ledger,
            converter,
            default_currency,
            provisioning,
        }
    }

    /// Credit `user`'s account with the converted deposit amount
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is malformed or not positive (`InvalidAmount`)
    /// - The payment method lacks a required detail (`MissingPaymentDetails`)
    /// - The user has no account and provisioning is disabled (`NoAccountForUser`)
    /// - The account lock could not be taken (`Conflict`) or the ledger append failed
    pub fn deposit(&self, user: UserId, request: &DepositRequest) -> Result<Transaction, PaymentError> {
        let amount = parse_amount(&request.amount)?;
        let description = describe(request.transfer_method, &request.details)?;
        let account = self.resolve_account(user)?;

        let rate = self.converter.rate(request.currency, account.currency)?;
        let converted = self
            .converter
            .convert(amount, request.currency, account.currency)?;

        let transaction = self.accounts.update_balance_with(account.id, |current| {
            let new_balance = current
                .balance
                .checked_add(converted)
                .ok_or_else(|| PaymentError::arithmetic_overflow("deposit"))?;

            let transaction = self.ledger.append(NewTransaction {
                from_account: current.id,
                to_account: current.id,
                amount,
                from_currency: request.currency,
                to_currency: current.currency,
                exchange_rate: rate,
                description,
                transfer_method: Some(request.transfer_method),
                pickup_location: None,
            })?;

            Ok((new_balance, transaction))
        })?;

        tracing::debug!(
            tx = transaction.id,
            account = account.id,
            amount = %amount,
            credited = %converted,
            method = %request.transfer_method,
            "deposit completed"
        );

        Ok(transaction)
    }

    fn resolve_account(&self, user: UserId) -> Result<Account, PaymentError> {
        match self.provisioning {
            ProvisioningPolicy::AutoProvision => {
                self.accounts.get_or_create(user, self.default_currency)
            }
            ProvisioningPolicy::Disallowed => self
                .accounts
                .get_account(user)
                .ok_or(PaymentError::NoAccountForUser { user }),
        }
    }
}

impl std::fmt::Debug for DepositEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepositEngine")
            .field("default_currency", &self.default_currency)
            .field("provisioning", &self.provisioning)
            .finish_non_exhaustive()
    }
}

/// Ledger description for a deposit, with payment references masked
fn describe(method: TransferMethod, details: &PaymentDetails) -> Result<String, PaymentError> {
    let card = details.masked_card();
    let bank = details.bank();

    match method {
        TransferMethod::CreditCard if card.is_none() => {
            return Err(PaymentError::missing_payment_details(method.as_str(), "card number"));
        }
        TransferMethod::BankTransfer if bank.is_none() => {
            return Err(PaymentError::missing_payment_details(method.as_str(), "bank name"));
        }
        _ => {}
    }

    let mut description = format!("Deposit via {}", method);
    if let Some(last4) = card {
        description.push_str(&format!(" (Card: {})", last4));
    }
    if let Some(bank) = bank {
        description.push_str(&format!(" (Bank: {})", bank));
    }
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::InMemoryLedger;
    use crate::types::AccountId;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct BrokenLedger;

    impl Ledger for BrokenLedger {
        fn append(&self, _draft: NewTransaction) -> Result<Transaction, PaymentError> {
            Err(PaymentError::persistence_failure("journal closed"))
        }

        fn list_for_account(&self, _account: AccountId) -> Vec<Transaction> {
            Vec::new()
        }
    }

    fn setup(provisioning: ProvisioningPolicy) -> (Arc<AccountStore>, Arc<InMemoryLedger>, DepositEngine) {
        let accounts = Arc::new(AccountStore::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = DepositEngine::new(
            Arc::clone(&accounts),
            ledger.clone(),
            CurrencyConverter::default(),
            Currency::Usd,
            provisioning,
        );
        (accounts, ledger, engine)
    }

    fn cash(amount: &str, currency: Currency) -> DepositRequest {
        DepositRequest {
            amount: amount.to_string(),
            currency,
            transfer_method: TransferMethod::Cash,
            details: PaymentDetails::default(),
        }
    }

    #[test]
    fn test_deposit_converts_into_account_currency() {
        let (accounts, _, engine) = setup(ProvisioningPolicy::AutoProvision);
        accounts.create_account(1, Currency::Usd).unwrap();

        let tx = engine.deposit(1, &cash("50.00", Currency::Eur)).unwrap();

        let account = accounts.get_account(1).unwrap();
        assert_eq!(account.balance.to_string(), "53.76");
        assert_eq!(tx.amount.to_string(), "50.00");
        assert_eq!(tx.from_currency, Currency::Eur);
        assert_eq!(tx.to_currency, Currency::Usd);
        assert_eq!(tx.exchange_rate.to_string(), "1.075269");
        assert_eq!(tx.from_account, account.id);
        assert_eq!(tx.to_account, account.id);
        assert_eq!(tx.description, "Deposit via cash");
    }

    #[test]
    fn test_deposits_accumulate() {
        let (accounts, ledger, engine) = setup(ProvisioningPolicy::AutoProvision);

        engine.deposit(1, &cash("10.00", Currency::Usd)).unwrap();
        engine.deposit(1, &cash("2.50", Currency::Usd)).unwrap();

        assert_eq!(accounts.get_account(1).unwrap().balance, dec!(12.50));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_deposit_provisions_account_in_default_currency() {
        let (accounts, _, engine) = setup(ProvisioningPolicy::AutoProvision);

        engine.deposit(9, &cash("1000", Currency::Syp)).unwrap();

        let account = accounts.get_account(9).unwrap();
        assert_eq!(account.currency, Currency::Usd);
        assert_eq!(account.balance, dec!(0.40));
    }

    #[test]
    fn test_deposit_without_provisioning() {
        let (accounts, ledger, engine) = setup(ProvisioningPolicy::Disallowed);

        let result = engine.deposit(9, &cash("10", Currency::Usd));

        assert_eq!(result, Err(PaymentError::NoAccountForUser { user: 9 }));
        assert_eq!(accounts.get_account(9), None);
        assert!(ledger.is_empty());
    }

    #[rstest]
    #[case::zero("0.00")]
    #[case::negative("-3")]
    #[case::text("lots")]
    fn test_invalid_amount_rejected(#[case] amount: &str) {
        let (accounts, ledger, engine) = setup(ProvisioningPolicy::AutoProvision);
        accounts.create_account(1, Currency::Usd).unwrap();

        let result = engine.deposit(1, &cash(amount, Currency::Usd));

        assert_eq!(result, Err(PaymentError::invalid_amount(amount)));
        assert_eq!(accounts.get_account(1).unwrap().balance, Decimal::ZERO);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_card_deposit_masks_card_number() {
        let (_, ledger, engine) = setup(ProvisioningPolicy::AutoProvision);
        let request = DepositRequest {
            amount: "20".to_string(),
            currency: Currency::Usd,
            transfer_method: TransferMethod::CreditCard,
            details: PaymentDetails {
                card_number: Some("4111 1111 1111 4242".to_string()),
                expiry_date: Some("12/29".to_string()),
                cvv: Some("123".to_string()),
                ..Default::default()
            },
        };

        let tx = engine.deposit(1, &request).unwrap();

        assert_eq!(tx.description, "Deposit via credit_card (Card: 4242)");
        assert!(!tx.description.contains("4111"));
        assert!(!tx.description.contains("12/29"));
        assert_eq!(ledger.get(tx.id), Some(tx));
    }

    #[test]
    fn test_bank_deposit_names_bank() {
        let (_, _, engine) = setup(ProvisioningPolicy::AutoProvision);
        let request = DepositRequest {
            amount: "20".to_string(),
            currency: Currency::Usd,
            transfer_method: TransferMethod::BankTransfer,
            details: PaymentDetails {
                bank_name: Some("Commercial Bank of Syria".to_string()),
                swift_code: Some("CBSYSYDA".to_string()),
                ..Default::default()
            },
        };

        let tx = engine.deposit(1, &request).unwrap();

        assert_eq!(
            tx.description,
            "Deposit via bank_transfer (Bank: Commercial Bank of Syria)"
        );
    }

    #[rstest]
    #[case(TransferMethod::CreditCard, "card number")]
    #[case(TransferMethod::BankTransfer, "bank name")]
    fn test_missing_payment_details(#[case] method: TransferMethod, #[case] field: &str) {
        let (_, ledger, engine) = setup(ProvisioningPolicy::AutoProvision);
        let request = DepositRequest {
            amount: "20".to_string(),
            currency: Currency::Usd,
            transfer_method: method,
            details: PaymentDetails::default(),
        };

        let result = engine.deposit(1, &request);

        assert_eq!(
            result,
            Err(PaymentError::missing_payment_details(method.as_str(), field))
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ledger_failure_leaves_balance() {
        let accounts = Arc::new(AccountStore::new());
        let engine = DepositEngine::new(
            Arc::clone(&accounts),
            Arc::new(BrokenLedger),
            CurrencyConverter::default(),
            Currency::Usd,
            ProvisioningPolicy::AutoProvision,
        );
        let account = accounts.create_account(1, Currency::Usd).unwrap();
        accounts.update_balance(account.id, dec!(5.00)).unwrap();

        let result = engine.deposit(1, &cash("10", Currency::Usd));

        assert!(matches!(result, Err(PaymentError::PersistenceFailure { .. })));
        assert_eq!(accounts.get_by_id(account.id).unwrap().balance, dec!(5.00));
    }
}
