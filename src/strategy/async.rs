//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. Operations are read in batches; within a batch,
//! groups of related users are replayed concurrently.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (user-group partitioning + tokio tasks)
//!         └── TransferService (per-account locks, shared ledger)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so an operation never runs
//!   before an earlier batch has finished
//! - Within a batch, operations of one user group run in file order
//! - Unrelated groups run in parallel on the tokio multi-threaded runtime

use crate::core::TransferService;
use crate::io::async_reader::AsyncReader;
use crate::strategy::{write_report, BatchProcessor, ProcessingStrategy, Report};
use crate::types::PaymentError;
use std::io::Write;
use std::path::Path;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of script rows per batch
    pub batch_size: usize,
    /// Worker threads for the replay runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                default = default.batch_size,
                "invalid batch_size 0, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches 0, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    service: TransferService,
    report: Report,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `config` - BatchConfig with batch_size and max_concurrent_batches
    /// * `service` - Service the operations are applied to
    /// * `report` - What to write after the replay
    pub fn new(config: BatchConfig, service: TransferService, report: Report) -> Self {
        Self {
            config,
            service,
            report,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the script in batches, then write the report
    ///
    /// 1. Starts a tokio multi-threaded runtime
    /// 2. Reads operations in batches with AsyncReader
    /// 3. Processes each batch to completion before reading the next
    /// 4. Writes the report for the final state
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), PaymentError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| PaymentError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(self.service.clone());

            let file = tokio::fs::File::open(input_path).await.map_err(|e| {
                match e.kind() {
                    std::io::ErrorKind::NotFound => PaymentError::FileNotFound {
                        path: input_path.display().to_string(),
                    },
                    _ => PaymentError::from(e),
                }
            })?;

            // csv-async reads through the futures AsyncRead traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for outcome in processor.process_batch(batch).await {
                    match outcome.result {
                        Ok(()) => applied += 1,
                        Err(_) => rejected += 1,
                    }
                }
            }

            tracing::info!(applied, rejected, "replay finished");
            write_report(&self.service, &self.report, output)
        })
    }
}
