//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over operations from a script file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<Operation, PaymentError>` for each CSV row:
//!
//! ```no_run
//! use rust_transfer_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("Replaying: {:?}", operation),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found) are returned from `new()`
//! - Individual record errors are yielded as Err variants carrying the line
//!   number, and iteration continues with the next row

use crate::core::Operation;
use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::PaymentError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Reads one record at a time; memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a script for streaming iteration
    ///
    /// The CSV reader trims whitespace from all fields and accepts short
    /// rows, since trailing optional columns may be left off.
    ///
    /// # Errors
    ///
    /// `FileNotFound` if the file does not exist, `IoError` for any other
    /// open failure.
    pub fn new(path: &Path) -> Result<Self, PaymentError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PaymentError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => PaymentError::from(e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, PaymentError>;

    /// Next operation, or the error for the row that failed to parse
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let result = deserializer.next()?;
        self.line_num += 1;
        let line = self.line_num;

        Some(
            result
                .map_err(PaymentError::from)
                .and_then(convert_csv_record)
                .map_err(|e| with_line(e, line)),
        )
    }
}

/// Attach a line number to parse errors that lack one
pub(crate) fn with_line(error: PaymentError, line: u64) -> PaymentError {
    match error {
        PaymentError::ParseError {
            line: None,
            message,
        } => PaymentError::ParseError {
            line: Some(line),
            message,
        },
        other => other,
    }
}
