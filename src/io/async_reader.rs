//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over operations from a script. Supports
//! batch reading for the async replay strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Operations
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::core::Operation;
use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::io::sync_reader::with_line;
use crate::types::PaymentError;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Provides batch reading interface over operations.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    ///
    /// # Arguments
    ///
    /// * `reader` - Async reader providing CSV data, header row first
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read a batch of operations
    ///
    /// Reads up to `batch_size` rows. Rows that fail to parse are logged with
    /// their line number and skipped, so a batch may hold fewer operations
    /// than rows consumed. Reading continues past `batch_size` while the batch
    /// is still empty.
    ///
    /// # Returns
    ///
    /// The parsed operations in file order. Empty only once the script is
    /// exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Operation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows_read = 0;
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while rows_read < batch_size || batch.is_empty() {
            let Some(result) = records.next().await else {
                break;
            };
            rows_read += 1;
            self.line_num += 1;

            let parsed = result
                .map_err(|e| PaymentError::ParseError {
                    line: e.position().map(|pos| pos.line()),
                    message: e.to_string(),
                })
                .and_then(convert_csv_record)
                .map_err(|e| with_line(e, self.line_num));

            match parsed {
                Ok(operation) => batch.push(operation),
                Err(error) => tracing::warn!(%error, "skipping operation"),
            }
        }

        batch
    }
}
