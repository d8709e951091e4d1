//! Structured logging setup.
//!
//! Diagnostics go through `tracing` to stderr so that stdout only carries
//! build output (tool lines, planned commands, artifact paths). `RUST_LOG`
//! takes precedence over the level picked from the command line.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// `DEBUG` with `--verbose`, `INFO` otherwise.
pub fn level_for(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::INFO }
}

/// Builds the filter from `RUST_LOG`, with `level` as the default directive.
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

/// Initializes the global subscriber. Subsequent calls are ignored.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let result = tracing_subscriber::fmt()
            .with_env_filter(env_filter(level_for(verbose)))
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .try_init();

        if let Err(e) = result {
            eprintln!("Failed to initialize logging: {}", e);
        }
    });
}
