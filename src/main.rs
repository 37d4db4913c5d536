//! Transfer engine CLI
//!
//! Replays an operation script through the transfer engine and writes the
//! resulting balances (or one user's statement) to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > balances.csv
//! cargo run -- --strategy async --batch-size 500 operations.csv > balances.csv
//! cargo run -- --journal ledger.csv --statement alice operations.csv
//! RUST_LOG=debug cargo run -- operations.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, journal not writable, output failure, etc.)

use rust_transfer_engine::cli;
use rust_transfer_engine::core::{
    InMemoryLedger, InMemoryUserDirectory, Ledger, StaticRates, TransferService,
};
use rust_transfer_engine::io::CsvJournalLedger;
use rust_transfer_engine::logging;
use rust_transfer_engine::strategy;
use rust_transfer_engine::PaymentError;
use std::process;
use std::sync::Arc;

fn run(args: &cli::CliArgs) -> Result<(), PaymentError> {
    let ledger: Arc<dyn Ledger> = match &args.journal {
        Some(path) => Arc::new(CsvJournalLedger::create(path)?),
        None => Arc::new(InMemoryLedger::new()),
    };

    let service = TransferService::new(
        args.to_engine_config(),
        ledger,
        Arc::new(InMemoryUserDirectory::new()),
        Arc::new(StaticRates),
    );

    let config = match args.strategy {
        cli::StrategyType::Async => Some(args.to_batch_config()),
        cli::StrategyType::Sync => None,
    };
    let strategy = strategy::create_strategy(args.strategy, config, service, args.report());

    let mut output = std::io::stdout();
    strategy.process(&args.input_file, &mut output)
}

fn main() {
    let args = cli::parse_args();
    logging::init_logging(&args.log_level);

    if let Err(e) = run(&args) {
        tracing::error!(kind = ?e.kind(), "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
