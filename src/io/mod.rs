//! I/O module
//!
//! Handles operation-script parsing, CSV output, and the durable journal.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, output serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface
//! - `journal` - Ledger that journals every transaction to a CSV file

pub mod async_reader;
pub mod csv_format;
pub mod journal;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_csv_record, write_accounts_csv, write_statement_csv, CsvRecord};
pub use journal::CsvJournalLedger;
pub use sync_reader::SyncReader;
