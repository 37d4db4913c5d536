use crate::config::{EngineConfig, ProvisioningPolicy, DEFAULT_LOCK_ATTEMPTS};
use crate::strategy::{BatchConfig, Report};
use crate::types::Currency;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay money-transfer operations against the transfer engine
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(about = "Replay money-transfer operations and report balances", long_about = None)]
pub struct CliArgs {
    /// Operation script containing register, deposit and transfer rows
    #[arg(value_name = "INPUT", help = "Path to the operation script CSV")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Replay strategy: 'sync' for sequential or 'async' for batched replay"
    )]
    pub strategy: StrategyType,

    /// Number of script rows per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of rows per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for the async runtime (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for batched replay (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Currency for accounts opened without one
    #[arg(
        long = "default-currency",
        value_name = "CODE",
        default_value = "USD",
        value_parser = parse_currency
    )]
    pub default_currency: Currency,

    /// Do not open accounts implicitly on first deposit
    #[arg(long = "no-provisioning")]
    pub no_provisioning: bool,

    /// Bound on lock attempts before an operation fails with a conflict
    #[arg(long = "lock-attempts", value_name = "COUNT", default_value_t = DEFAULT_LOCK_ATTEMPTS)]
    pub lock_attempts: u32,

    /// Journal every transaction to this CSV file
    #[arg(long = "journal", value_name = "PATH")]
    pub journal: Option<PathBuf>,

    /// Print this user's statement instead of all balances
    #[arg(long = "statement", value_name = "USER")]
    pub statement: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

fn parse_currency(value: &str) -> Result<Currency, String> {
    value.parse::<Currency>().map_err(|e| e.to_string())
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Engine configuration from the CLI flags
    pub fn to_engine_config(&self) -> EngineConfig {
        let provisioning = if self.no_provisioning {
            ProvisioningPolicy::Disallowed
        } else {
            ProvisioningPolicy::AutoProvision
        };
        EngineConfig::new(self.default_currency, provisioning, self.lock_attempts)
    }

    /// Report requested on the command line
    pub fn report(&self) -> Report {
        match &self.statement {
            Some(username) => Report::Statement {
                username: username.clone(),
            },
            None => Report::Balances,
        }
    }
}
