//! Processing strategy module for operation-script replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and application of each operation to a
//! [`TransferService`]. Different implementations (synchronous, asynchronous
//! batch) can be selected at runtime and produce the same final state.

use crate::cli::StrategyType;
use crate::core::{Operation, TransferService};
use crate::io::csv_format::{write_accounts_csv, write_statement_csv};
use crate::types::PaymentError;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod batch_processor;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use sync::SyncProcessingStrategy;

/// What a strategy writes once the script has been replayed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Report {
    /// Every account's balance, one row per user
    #[default]
    Balances,

    /// The named user's transaction history, oldest first
    ///
    /// Ids in the statement depend on the replay schedule; see
    /// [`write_statement_csv`].
    Statement { username: String },
}

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the operations in `input_path` and write the report to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - The async runtime cannot be started
    /// - The report cannot be produced or written
    ///
    /// Rejected operations are logged and skipped; they never fail the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), PaymentError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
/// * `service` - Service the operations are applied to
/// * `report` - What to write after the replay
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    service: TransferService,
    report: Report,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(service, report)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, service, report))
        }
    }
}

/// Apply one operation, logging it if the service rejects it
pub(crate) fn apply_logged(service: &TransferService, operation: &Operation) -> Result<(), PaymentError> {
    let result = operation.apply(service);
    if let Err(error) = &result {
        tracing::warn!(
            user = operation.username(),
            kind = ?error.kind(),
            %error,
            "operation rejected"
        );
    }
    result
}

/// Write `report` for the current state of `service`
pub fn write_report(
    service: &TransferService,
    report: &Report,
    output: &mut dyn Write,
) -> Result<(), PaymentError> {
    match report {
        Report::Balances => write_accounts_csv(&service.account_summaries(), output),
        Report::Statement { username } => {
            let user = service.users().find_by_username(username).ok_or_else(|| {
                PaymentError::UnknownUsername {
                    username: username.clone(),
                }
            })?;
            let history = service.list_transactions_for_user(user.id)?;
            write_statement_csv(&history, output)
        }
    }
}
