//! Tracing subscriber setup for the binary
//!
//! Logs go to stderr so stdout carries only CSV output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence; otherwise `default_level` is used as the
/// filter directive (e.g. `warn`, `debug`, `rust_transfer_engine=trace`).
/// A second call leaves the first subscriber in place.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    if tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialised");
    }
}
