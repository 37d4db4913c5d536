//! Durable CSV journal ledger
//!
//! `CsvJournalLedger` wraps an [`InMemoryLedger`] and writes every appended
//! transaction to a CSV journal before it becomes visible. Each row is encoded
//! into its own buffer and handed to the sink in one `write_all` followed by a
//! flush, so a row that failed to persist is never left queued for a later
//! append. A write or flush failure is reported as `PersistenceFailure` and
//! nothing is inserted, so the engines leave balances untouched.
//!
//! The sink lock is held while a transaction is stamped, written and
//! inserted, so journal rows appear in id and `created_at` order.
//!
//! Journal columns: `id, created_at, from, to, amount, from_currency,
//! to_currency, exchange_rate, description, transfer_method, pickup_location`.

use crate::core::{InMemoryLedger, Ledger};
use crate::types::{AccountId, NewTransaction, PaymentError, Transaction};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

const JOURNAL_HEADER: [&str; 11] = [
    "id",
    "created_at",
    "from",
    "to",
    "amount",
    "from_currency",
    "to_currency",
    "exchange_rate",
    "description",
    "transfer_method",
    "pickup_location",
];

/// Ledger that journals each transaction to a CSV sink
pub struct CsvJournalLedger<W: Write + Send = File> {
    inner: InMemoryLedger,
    sink: Mutex<W>,
}

impl CsvJournalLedger<File> {
    /// Create (or truncate) a journal file and write its header
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` if the file cannot be created or the header
    /// cannot be written.
    pub fn create(path: &Path) -> Result<Self, PaymentError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                PaymentError::persistence_failure(format!(
                    "cannot open journal '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        Self::from_writer(file)
    }
}

impl<W: Write + Send> CsvJournalLedger<W> {
    /// Journal into any writer; the header row is written immediately
    pub fn from_writer(mut sink: W) -> Result<Self, PaymentError> {
        let header = encode_row(JOURNAL_HEADER)?;
        write_flushed(&mut sink, &header)?;

        Ok(Self {
            inner: InMemoryLedger::new(),
            sink: Mutex::new(sink),
        })
    }

    /// Number of journalled transactions
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<W: Write + Send> Ledger for CsvJournalLedger<W> {
    fn append(&self, draft: NewTransaction) -> Result<Transaction, PaymentError> {
        let mut sink = self
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let transaction = self.inner.stamp(draft);
        let persisted = encode_row(journal_fields(&transaction))
            .and_then(|row| write_flushed(&mut *sink, &row));

        if let Err(error) = persisted {
            tracing::error!(tx = transaction.id, %error, "journal write failed");
            return Err(error);
        }

        self.inner.insert(transaction.clone());
        Ok(transaction)
    }

    fn list_for_account(&self, account: AccountId) -> Vec<Transaction> {
        self.inner.list_for_account(account)
    }
}

impl<W: Write + Send> std::fmt::Debug for CsvJournalLedger<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvJournalLedger")
            .field("entries", &self.inner.len())
            .finish_non_exhaustive()
    }
}

fn journal_fields(tx: &Transaction) -> [String; 11] {
    [
        tx.id.to_string(),
        tx.created_at.to_rfc3339(),
        tx.from_account.to_string(),
        tx.to_account.to_string(),
        format!("{:.2}", tx.amount),
        tx.from_currency.to_string(),
        tx.to_currency.to_string(),
        format!("{:.6}", tx.exchange_rate),
        tx.description.clone(),
        tx.transfer_method
            .map(|method| method.to_string())
            .unwrap_or_default(),
        tx.pickup_location
            .map(|location| location.to_string())
            .unwrap_or_default(),
    ]
}

/// Encode one CSV record into a standalone buffer
fn encode_row<I, T>(fields: I) -> Result<Vec<u8>, PaymentError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(fields)
        .map_err(|e| PaymentError::persistence_failure(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| PaymentError::persistence_failure(e.to_string()))
}

fn write_flushed<W: Write>(sink: &mut W, bytes: &[u8]) -> Result<(), PaymentError> {
    sink.write_all(bytes)
        .and_then(|_| sink.flush())
        .map_err(|e| PaymentError::persistence_failure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, TransferMethod};
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::Arc;
    use std::thread;
    use tempfile::NamedTempFile;

    fn draft() -> NewTransaction {
        described("Transfer")
    }

    fn described(description: &str) -> NewTransaction {
        NewTransaction {
            from_account: 1,
            to_account: 2,
            amount: dec!(40.00),
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
            exchange_rate: dec!(0.930000),
            description: description.to_string(),
            transfer_method: Some(TransferMethod::Cash),
            pickup_location: None,
        }
    }

    /// Accepts the header, then fails every later write
    struct FailingSink {
        writes: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes > 1 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Shared in-memory file whose `fail_on`-th write call fails
    #[derive(Clone, Default)]
    struct SharedSink {
        bytes: Arc<Mutex<Vec<u8>>>,
        writes: Arc<Mutex<usize>>,
        fail_on: Option<usize>,
    }

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut writes = self.writes.lock().unwrap();
            *writes += 1;
            if Some(*writes) == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_append_is_journalled_before_visible() {
        let file = NamedTempFile::new().unwrap();
        let ledger = CsvJournalLedger::create(file.path()).unwrap();

        let tx = ledger.append(draft()).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], JOURNAL_HEADER.join(","));
        assert!(lines[1].starts_with(&format!("{},{}", tx.id, tx.created_at.to_rfc3339())));
        assert!(lines[1].ends_with(",1,2,40.00,USD,EUR,0.930000,Transfer,cash,"));
        assert_eq!(ledger.list_for_account(1), vec![tx]);
    }

    #[test]
    fn test_write_failure_is_not_visible() {
        let ledger = CsvJournalLedger::from_writer(FailingSink { writes: 0 }).unwrap();

        let result = ledger.append(draft());

        assert!(matches!(result, Err(PaymentError::PersistenceFailure { .. })));
        assert!(ledger.is_empty());
        assert!(ledger.list_for_account(1).is_empty());
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let result = CsvJournalLedger::create(Path::new("/nonexistent/dir/journal.csv"));

        assert!(matches!(result, Err(PaymentError::PersistenceFailure { .. })));
    }

    #[test]
    fn test_failed_row_is_not_written_by_later_append() {
        let sink = SharedSink {
            fail_on: Some(2),
            ..SharedSink::default()
        };
        let ledger = CsvJournalLedger::from_writer(sink.clone()).unwrap();

        let rejected = ledger.append(described("rejected"));
        let accepted = ledger.append(described("accepted")).unwrap();

        assert!(matches!(rejected, Err(PaymentError::PersistenceFailure { .. })));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.list_for_account(1), vec![accepted]);

        let contents = sink.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(",accepted,"));
        assert!(!contents.contains("rejected"));
    }

    #[test]
    fn test_concurrent_appends_are_journalled_in_id_order() {
        let sink = SharedSink::default();
        let ledger = Arc::new(CsvJournalLedger::from_writer(sink.clone()).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..50 {
                        ledger.append(draft()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = sink.contents();
        let ids: Vec<u64> = contents
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(ids, (1..=200).collect::<Vec<u64>>());
    }
}
