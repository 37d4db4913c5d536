//! Boundary contract exposed to the application layer
//!
//! `TransferService` is constructed once at start-up with its collaborators
//! injected, then shared by handle between request handlers. Every operation
//! that acts on behalf of a user first resolves that user through the
//! directory; an id the directory does not know is refused with
//! `Unauthenticated` before any state is read.

use crate::config::{EngineConfig, ProvisioningPolicy};
use crate::core::account_store::AccountStore;
use crate::core::conversion::{CurrencyConverter, StaticRates};
use crate::core::deposit::{DepositEngine, DepositRequest};
use crate::core::ledger::InMemoryLedger;
use crate::core::traits::{Ledger, RateProvider, UserDirectory};
use crate::core::transfer::{TransferEngine, TransferRequest};
use crate::core::users::InMemoryUserDirectory;
use crate::types::{Account, Currency, PaymentError, Transaction, User, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;

/// A user paired with their account, as reported by [`TransferService::account_summaries`]
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub username: String,
    pub account: Account,
}

#[derive(Clone)]
pub struct TransferService {
    config: EngineConfig,
    accounts: Arc<AccountStore>,
    ledger: Arc<dyn Ledger>,
    users: Arc<dyn UserDirectory>,
    converter: CurrencyConverter,
    transfers: TransferEngine,
    deposits: DepositEngine,
}

impl TransferService {
    /// Wire the engines around the given collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Default currency, provisioning policy and lock bound
    /// * `ledger` - Transaction history; in-memory or journalled
    /// * `users` - Directory used to authenticate callers and resolve recipients
    /// * `rates` - Source of currency rates, read once per operation
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn Ledger>,
        users: Arc<dyn UserDirectory>,
        rates: Arc<dyn RateProvider>,
    ) -> Self {
        let accounts = Arc::new(AccountStore::with_lock_attempts(config.lock_attempts));
        let converter = CurrencyConverter::new(rates);

        let transfers = TransferEngine::new(
            Arc::clone(&accounts),
            Arc::clone(&ledger),
            Arc::clone(&users),
            converter.clone(),
        );
        let deposits = DepositEngine::new(
            Arc::clone(&accounts),
            Arc::clone(&ledger),
            converter.clone(),
            config.default_currency,
            config.provisioning,
        );

        Self {
            config,
            accounts,
            ledger,
            users,
            converter,
            transfers,
            deposits,
        }
    }

    /// Service backed entirely by in-process collaborators and the static rate table
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(StaticRates),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    /// Register a user with the directory
    ///
    /// No account is opened; see [`Self::open_account`] and
    /// [`Self::get_account_for_user`].
    pub fn register_user(&self, username: &str, credential_hash: &str) -> Result<User, PaymentError> {
        let user = self.users.register(username, credential_hash)?;
        tracing::debug!(user = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Open the user's account explicitly, in `currency` or the configured default
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for an unknown user, `DuplicateAccount` if the user
    /// already has one.
    pub fn open_account(&self, user: UserId, currency: Option<Currency>) -> Result<Account, PaymentError> {
        let user = self.authenticate(user)?;
        let currency = currency.unwrap_or(self.config.default_currency);
        let account = self.accounts.create_account(user.id, currency)?;

        tracing::debug!(
            user = user.id,
            account = account.id,
            currency = %currency,
            "account opened"
        );
        Ok(account)
    }

    /// The user's account, provisioned on first access when the policy allows
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for an unknown user; `NoAccountForUser` when the
    /// user has no account and provisioning is disabled.
    pub fn get_account_for_user(&self, user: UserId) -> Result<Account, PaymentError> {
        let user = self.authenticate(user)?;
        match self.config.provisioning {
            ProvisioningPolicy::AutoProvision => {
                self.accounts.get_or_create(user.id, self.config.default_currency)
            }
            ProvisioningPolicy::Disallowed => self
                .accounts
                .get_account(user.id)
                .ok_or(PaymentError::NoAccountForUser { user: user.id }),
        }
    }

    /// Every transaction touching the user's account, oldest first
    ///
    /// Reads never provision: a user without an account gets
    /// `NoAccountForUser`, while an account without history yields an empty
    /// list.
    pub fn list_transactions_for_user(&self, user: UserId) -> Result<Vec<Transaction>, PaymentError> {
        let user = self.authenticate(user)?;
        let account = self
            .accounts
            .get_account(user.id)
            .ok_or(PaymentError::NoAccountForUser { user: user.id })?;

        Ok(self.ledger.list_for_account(account.id))
    }

    /// Exchange rate from `from` to `to` at six decimal places
    pub fn quote_rate(&self, from: Currency, to: Currency) -> Result<Decimal, PaymentError> {
        self.converter.rate(from, to)
    }

    /// Move funds from `requester` to the recipient named in `request`
    ///
    /// `request.currency` is the currency the amount is quoted in and must
    /// match the requester's account; the recipient side is converted.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for an unknown requester, otherwise any error of
    /// [`TransferEngine::transfer`].
    pub fn execute_transfer(
        &self,
        requester: UserId,
        request: &TransferRequest,
    ) -> Result<Transaction, PaymentError> {
        let requester = self.authenticate(requester)?;
        self.transfers.transfer(requester.id, request)
    }

    /// Credit the user's account from an external payment method
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for an unknown user, otherwise any error of
    /// [`DepositEngine::deposit`].
    pub fn execute_deposit(&self, user: UserId, request: &DepositRequest) -> Result<Transaction, PaymentError> {
        let user = self.authenticate(user)?;
        self.deposits.deposit(user.id, request)
    }

    /// Every account with its owner's username, sorted by username
    pub fn account_summaries(&self) -> Vec<AccountSummary> {
        let mut summaries: Vec<AccountSummary> = self
            .accounts
            .all_accounts()
            .into_iter()
            .filter_map(|account| {
                let user = self.users.get(account.owner)?;
                Some(AccountSummary {
                    username: user.username,
                    account,
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.username.cmp(&b.username));
        summaries
    }

    fn authenticate(&self, user: UserId) -> Result<User, PaymentError> {
        self.users.get(user).ok_or(PaymentError::Unauthenticated)
    }
}

impl std::fmt::Debug for TransferService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferService")
            .field("config", &self.config)
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}
