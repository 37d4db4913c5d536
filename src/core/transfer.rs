//! Transfer processing engine
//!
//! This module provides the `TransferEngine`, which moves funds from a
//! requester's account to a recipient's account with currency conversion.
//!
//! The engine enforces, in order:
//! 1. The requester has an account
//! 2. The recipient username resolves to a user
//! 3. The recipient has an account
//! 4. The amount is a positive two-decimal figure (in the source currency)
//! 5. The source balance covers the amount
//!
//! Steps 5 onwards run while both account locks are held: the sufficiency
//! check, the debit, the credit, and the ledger append form one unit. If the
//! append fails neither balance is written.

use crate::core::account_store::AccountStore;
use crate::core::conversion::CurrencyConverter;
use crate::core::traits::{Ledger, UserDirectory};
use crate::types::money::{parse_amount, round_amount};
use crate::types::{
    Currency, NewTransaction, PaymentError, PickupLocation, Transaction, TransferMethod, UserId,
    DEFAULT_TRANSFER_DESCRIPTION,
};
use std::sync::Arc;

/// A request to move funds to another user
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Recipient's username
    pub to_username: String,

    /// Amount as supplied by the caller, in the requester's currency
    pub amount: String,

    /// Currency the amount is quoted in; must match the requester's account
    /// when given
    pub currency: Option<Currency>,

    pub description: Option<String>,
    pub transfer_method: Option<TransferMethod>,
    pub pickup_location: Option<PickupLocation>,
}

impl TransferRequest {
    /// Request with only the required fields set
    pub fn new(to_username: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            to_username: to_username.into(),
            amount: amount.into(),
            currency: None,
            description: None,
            transfer_method: None,
            pickup_location: None,
        }
    }
}

/// Orchestrates transfers between two accounts
#[derive(Clone)]
pub struct TransferEngine {
    accounts: Arc<AccountStore>,
    ledger: Arc<dyn Ledger>,
    users: Arc<dyn UserDirectory>,
    converter: CurrencyConverter,
}

impl TransferEngine {
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<dyn Ledger>,
        users: Arc<dyn UserDirectory>,
        converter: CurrencyConverter,
    ) -> Self {
        Self {
            accounts,
            ledger,
            users,
            converter,
        }
    }

    /// Transfer funds from `requester` to the user named in `request`
    ///
    /// The debit is `amount` in the source currency; the credit is
    /// `amount * rate` rounded half-up, in the destination currency. The rate
    /// is read once, before the locks are taken.
    ///
    /// # Returns
    ///
    /// The ledger record of the completed transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The requester has no account (`SourceAccountNotFound`)
    /// - The recipient is unknown (`RecipientNotFound`) or has no account
    ///   (`RecipientAccountNotFound`)
    /// - The amount is malformed or not positive (`InvalidAmount`)
    /// - The amount is quoted in another currency (`CurrencyMismatch`)
    /// - Recipient and requester share the account (`SelfTransfer`)
    /// - The balance does not cover the amount (`InsufficientFunds`)
    /// - A lock could not be taken (`Conflict`) or the ledger append failed
    pub fn transfer(
        &self,
        requester: UserId,
        request: &TransferRequest,
    ) -> Result<Transaction, PaymentError> {
        let from_account = self
            .accounts
            .get_account(requester)
            .ok_or(PaymentError::SourceAccountNotFound { user: requester })?;

        let recipient = self
            .users
            .find_by_username(&request.to_username)
            .ok_or_else(|| PaymentError::recipient_not_found(&request.to_username))?;

        let to_account = self
            .accounts
            .get_account(recipient.id)
            .ok_or_else(|| PaymentError::recipient_account_not_found(&recipient.username))?;

        let amount = parse_amount(&request.amount)?;

        if let Some(currency) = request.currency {
            if currency != from_account.currency {
                return Err(PaymentError::CurrencyMismatch {
                    expected: from_account.currency.to_string(),
                    actual: currency.to_string(),
                });
            }
        }

        if from_account.id == to_account.id {
            return Err(PaymentError::SelfTransfer);
        }

        let rate = self
            .converter
            .rate(from_account.currency, to_account.currency)?;

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_TRANSFER_DESCRIPTION)
            .to_string();

        let transaction = self
            .accounts
            .update_pair_with(from_account.id, to_account.id, |source, destination| {
                if source.balance < amount {
                    return Err(PaymentError::insufficient_funds(
                        source.id,
                        source.balance,
                        amount,
                    ));
                }

                let converted = amount
                    .checked_mul(rate)
                    .map(round_amount)
                    .ok_or_else(|| PaymentError::arithmetic_overflow("convert"))?;
                let new_source_balance = source.balance - amount;
                let new_destination_balance = destination
                    .balance
                    .checked_add(converted)
                    .ok_or_else(|| PaymentError::arithmetic_overflow("credit"))?;

                let transaction = self.ledger.append(NewTransaction {
                    from_account: source.id,
                    to_account: destination.id,
                    amount,
                    from_currency: source.currency,
                    to_currency: destination.currency,
                    exchange_rate: rate,
                    description,
                    transfer_method: request.transfer_method,
                    pickup_location: request.pickup_location,
                })?;

                Ok((new_source_balance, new_destination_balance, transaction))
            })?;

        tracing::debug!(
            tx = transaction.id,
            from = transaction.from_account,
            to = transaction.to_account,
            amount = %transaction.amount,
            rate = %transaction.exchange_rate,
            "transfer completed"
        );

        Ok(transaction)
    }
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::InMemoryLedger;
    use crate::core::users::InMemoryUserDirectory;
    use crate::types::AccountId;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Barrier;
    use std::thread;

    /// Ledger whose writes always fail
    struct BrokenLedger;

    impl Ledger for BrokenLedger {
        fn append(&self, _draft: NewTransaction) -> Result<Transaction, PaymentError> {
            Err(PaymentError::persistence_failure("disk full"))
        }

        fn list_for_account(&self, _account: AccountId) -> Vec<Transaction> {
            Vec::new()
        }
    }

    struct Fixture {
        accounts: Arc<AccountStore>,
        ledger: Arc<InMemoryLedger>,
        users: Arc<InMemoryUserDirectory>,
        engine: TransferEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let accounts = Arc::new(AccountStore::new());
            let ledger = Arc::new(InMemoryLedger::new());
            let users = Arc::new(InMemoryUserDirectory::new());
            let engine = TransferEngine::new(
                Arc::clone(&accounts),
                ledger.clone(),
                users.clone(),
                CurrencyConverter::default(),
            );
            Self {
                accounts,
                ledger,
                users,
                engine,
            }
        }

        /// Register a user holding `balance` in `currency`
        fn user(&self, name: &str, balance: Decimal, currency: Currency) -> (UserId, AccountId) {
            let user = self.users.register(name, "hash").unwrap();
            let account = self.accounts.create_account(user.id, currency).unwrap();
            self.accounts.update_balance(account.id, balance).unwrap();
            (user.id, account.id)
        }

        fn balance(&self, account: AccountId) -> Decimal {
            self.accounts.get_by_id(account).unwrap().balance
        }
    }

    #[test]
    fn test_transfer_with_conversion() {
        let fx = Fixture::new();
        let (alice, a) = fx.user("alice", dec!(100.00), Currency::Usd);
        let (_, b) = fx.user("bob", dec!(0.00), Currency::Eur);

        let tx = fx
            .engine
            .transfer(alice, &TransferRequest::new("bob", "40.00"))
            .unwrap();

        assert_eq!(fx.balance(a).to_string(), "60.00");
        assert_eq!(fx.balance(b).to_string(), "37.20");
        assert_eq!(tx.amount.to_string(), "40.00");
        assert_eq!(tx.from_currency, Currency::Usd);
        assert_eq!(tx.to_currency, Currency::Eur);
        assert_eq!(tx.exchange_rate.to_string(), "0.930000");
        assert_eq!(tx.from_account, a);
        assert_eq!(tx.to_account, b);
        assert_eq!(fx.ledger.len(), 1);
    }

    #[test]
    fn test_description_defaults_and_metadata_recorded() {
        let fx = Fixture::new();
        let (alice, _) = fx.user("alice", dec!(10.00), Currency::Usd);
        fx.user("bob", dec!(0.00), Currency::Syp);

        let mut request = TransferRequest::new("bob", "1");
        request.transfer_method = Some(TransferMethod::Cash);
        request.pickup_location = Some(PickupLocation::Aleppo);
        let tx = fx.engine.transfer(alice, &request).unwrap();

        assert_eq!(tx.description, "Transfer");
        assert_eq!(tx.transfer_method, Some(TransferMethod::Cash));
        assert_eq!(tx.pickup_location, Some(PickupLocation::Aleppo));

        request.description = Some("rent".to_string());
        let tx = fx.engine.transfer(alice, &request).unwrap();
        assert_eq!(tx.description, "rent");
    }

    #[test]
    fn test_exact_balance_can_be_sent() {
        let fx = Fixture::new();
        let (alice, a) = fx.user("alice", dec!(25.00), Currency::Eur);
        let (_, b) = fx.user("bob", dec!(1.00), Currency::Eur);

        fx.engine
            .transfer(alice, &TransferRequest::new("bob", "25.00"))
            .unwrap();

        assert_eq!(fx.balance(a), Decimal::ZERO);
        assert_eq!(fx.balance(b), dec!(26.00));
    }

    #[test]
    fn test_source_account_checked_first() {
        let fx = Fixture::new();
        let stranger = fx.users.register("stranger", "hash").unwrap();

        let result = fx
            .engine
            .transfer(stranger.id, &TransferRequest::new("nobody", "-5"));

        assert_eq!(
            result,
            Err(PaymentError::SourceAccountNotFound { user: stranger.id })
        );
    }

    #[test]
    fn test_unknown_recipient() {
        let fx = Fixture::new();
        let (alice, _) = fx.user("alice", dec!(10.00), Currency::Usd);

        let result = fx.engine.transfer(alice, &TransferRequest::new("nobody", "oops"));

        assert_eq!(result, Err(PaymentError::recipient_not_found("nobody")));
    }

    #[test]
    fn test_recipient_without_account() {
        let fx = Fixture::new();
        let (alice, _) = fx.user("alice", dec!(10.00), Currency::Usd);
        fx.users.register("bob", "hash").unwrap();

        let result = fx.engine.transfer(alice, &TransferRequest::new("bob", "1.00"));

        assert_eq!(result, Err(PaymentError::recipient_account_not_found("bob")));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-10.00")]
    #[case::malformed("ten dollars")]
    #[case::too_precise("1.001")]
    fn test_invalid_amount_changes_nothing(#[case] amount: &str) {
        let fx = Fixture::new();
        let (alice, a) = fx.user("alice", dec!(100.00), Currency::Usd);
        let (_, b) = fx.user("bob", dec!(5.00), Currency::Usd);

        let result = fx.engine.transfer(alice, &TransferRequest::new("bob", amount));

        assert_eq!(result, Err(PaymentError::invalid_amount(amount)));
        assert_eq!(fx.balance(a), dec!(100.00));
        assert_eq!(fx.balance(b), dec!(5.00));
        assert!(fx.ledger.is_empty());
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let fx = Fixture::new();
        let (alice, a) = fx.user("alice", dec!(30.00), Currency::Usd);
        let (_, b) = fx.user("bob", dec!(0.00), Currency::Eur);

        let result = fx.engine.transfer(alice, &TransferRequest::new("bob", "30.01"));

        assert_eq!(
            result,
            Err(PaymentError::insufficient_funds(a, dec!(30.00), dec!(30.01)))
        );
        assert_eq!(fx.balance(a), dec!(30.00));
        assert_eq!(fx.balance(b), Decimal::ZERO);
        assert!(fx.ledger.is_empty());
    }

    #[test]
    fn test_currency_mismatch() {
        let fx = Fixture::new();
        let (alice, _) = fx.user("alice", dec!(30.00), Currency::Usd);
        fx.user("bob", dec!(0.00), Currency::Eur);

        let mut request = TransferRequest::new("bob", "10");
        request.currency = Some(Currency::Eur);

        let result = fx.engine.transfer(alice, &request);

        assert!(matches!(result, Err(PaymentError::CurrencyMismatch { .. })));
        assert!(fx.ledger.is_empty());
    }

    #[test]
    fn test_self_transfer_rejected() {
        let fx = Fixture::new();
        let (alice, a) = fx.user("alice", dec!(30.00), Currency::Usd);

        let result = fx.engine.transfer(alice, &TransferRequest::new("alice", "10"));

        assert_eq!(result, Err(PaymentError::SelfTransfer));
        assert_eq!(fx.balance(a), dec!(30.00));
    }

    #[test]
    fn test_ledger_failure_rolls_back_balances() {
        let accounts = Arc::new(AccountStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let engine = TransferEngine::new(
            Arc::clone(&accounts),
            Arc::new(BrokenLedger),
            users.clone(),
            CurrencyConverter::default(),
        );
        let alice = users.register("alice", "hash").unwrap();
        let bob = users.register("bob", "hash").unwrap();
        let a = accounts.create_account(alice.id, Currency::Usd).unwrap();
        let b = accounts.create_account(bob.id, Currency::Usd).unwrap();
        accounts.update_balance(a.id, dec!(50.00)).unwrap();

        let result = engine.transfer(alice.id, &TransferRequest::new("bob", "20"));

        assert_eq!(result, Err(PaymentError::persistence_failure("disk full")));
        assert_eq!(accounts.get_by_id(a.id).unwrap().balance, dec!(50.00));
        assert_eq!(accounts.get_by_id(b.id).unwrap().balance, Decimal::ZERO);
    }

    #[rstest]
    #[case(Currency::Usd, Currency::Eur, "40.00")]
    #[case(Currency::Eur, Currency::Syp, "12.34")]
    #[case(Currency::Syp, Currency::Usd, "9999.99")]
    #[case(Currency::Eur, Currency::Usd, "0.07")]
    fn test_value_is_conserved_across_currencies(
        #[case] from: Currency,
        #[case] to: Currency,
        #[case] amount: &str,
    ) {
        let fx = Fixture::new();
        let converter = CurrencyConverter::default();
        let (alice, a) = fx.user("alice", dec!(20000.00), from);
        let (_, b) = fx.user("bob", dec!(3.00), to);

        let in_usd = |account: AccountId| {
            let acc = fx.accounts.get_by_id(account).unwrap();
            acc.balance * converter.rate(acc.currency, Currency::Usd).unwrap()
        };
        let before = in_usd(a) + in_usd(b);

        fx.engine
            .transfer(alice, &TransferRequest::new("bob", amount))
            .unwrap();

        let after = in_usd(a) + in_usd(b);
        // Half a cent of rounding in the destination currency, expressed in USD
        let tolerance = dec!(0.005) * converter.rate(to, Currency::Usd).unwrap() + dec!(0.0001);
        assert!(
            (before - after).abs() <= tolerance,
            "before {} after {}",
            before,
            after
        );
    }

    #[test]
    fn test_concurrent_overdraw_lets_exactly_one_through() {
        for _ in 0..20 {
            let fx = Fixture::new();
            let (alice, a) = fx.user("alice", dec!(100.00), Currency::Usd);
            let (_, b) = fx.user("bob", dec!(0.00), Currency::Usd);
            let (_, c) = fx.user("carol", dec!(0.00), Currency::Usd);

            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = ["bob", "carol"]
                .into_iter()
                .map(|recipient| {
                    let engine = fx.engine.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        engine.transfer(alice, &TransferRequest::new(recipient, "60.00"))
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let successes = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(successes, 1, "results: {:?}", results);
            assert!(results.iter().any(|r| matches!(
                r,
                Err(PaymentError::InsufficientFunds { .. }) | Err(PaymentError::Conflict { .. })
            )));
            assert_eq!(fx.balance(a), dec!(40.00));
            assert_eq!(fx.balance(b) + fx.balance(c), dec!(60.00));
            assert_eq!(fx.ledger.len(), 1);
        }
    }

    #[test]
    fn test_opposite_transfers_do_not_deadlock() {
        let fx = Fixture::new();
        let (alice, a) = fx.user("alice", dec!(500.00), Currency::Usd);
        let (bob, b) = fx.user("bob", dec!(500.00), Currency::Usd);

        let forward = {
            let engine = fx.engine.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    engine.transfer(alice, &TransferRequest::new("bob", "1.00")).unwrap();
                }
            })
        };
        let backward = {
            let engine = fx.engine.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    engine.transfer(bob, &TransferRequest::new("alice", "1.00")).unwrap();
                }
            })
        };
        forward.join().unwrap();
        backward.join().unwrap();

        assert_eq!(fx.balance(a), dec!(500.00));
        assert_eq!(fx.balance(b), dec!(500.00));
        assert_eq!(fx.ledger.len(), 400);
    }
}
