//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait. It streams operations from `SyncReader` and
//! applies each one to the service in file order.
//!
//! # Memory Efficiency
//!
//! Operations are read and applied one at a time; memory grows with accounts
//! and ledger entries, not with the size of the script.

use crate::core::TransferService;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{apply_logged, write_report, ProcessingStrategy, Report};
use crate::types::PaymentError;
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_transfer_engine::config::EngineConfig;
/// use rust_transfer_engine::core::TransferService;
/// use rust_transfer_engine::strategy::{ProcessingStrategy, Report, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let service = TransferService::in_memory(EngineConfig::default());
/// let strategy = SyncProcessingStrategy::new(service, Report::Balances);
///
/// strategy
///     .process(Path::new("operations.csv"), &mut std::io::stdout())
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    service: TransferService,
    report: Report,
}

impl SyncProcessingStrategy {
    pub fn new(service: TransferService, report: Report) -> Self {
        Self { service, report }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the script sequentially, then write the report
    ///
    /// Fatal errors (file not found, output errors) are returned immediately.
    /// Unparsable rows and rejected operations are logged and skipped.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), PaymentError> {
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0usize;
        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(operation) => match apply_logged(&self.service, &operation) {
                    Ok(()) => applied += 1,
                    Err(_) => rejected += 1,
                },
                Err(error) => {
                    rejected += 1;
                    tracing::warn!(%error, "skipping operation");
                }
            }
        }

        tracing::info!(applied, rejected, "replay finished");
        write_report(&self.service, &self.report, output)
    }
}
