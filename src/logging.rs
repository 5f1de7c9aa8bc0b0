//! Logging setup
//!
//! Operator-facing log lines go through `tracing`. Warnings and errors use
//! their own levels; info lines that report a completed on-chain action or a
//! notable step carry a `tag` field (`success` / `custom`) so they stand out
//! in the formatted output.

use tracing_subscriber::EnvFilter;

/// Logs an info line tagged `success` (a transaction was mined, a run finished).
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        ::tracing::info!(tag = "success", $($arg)+)
    };
}

/// Logs an info line tagged `custom` (a notable step inside a cycle).
#[macro_export]
macro_rules! custom {
    ($($arg:tt)+) => {
        ::tracing::info!(tag = "custom", $($arg)+)
    };
}

/// Picks the filter: `RUST_LOG` when set, the configured level otherwise.
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initializes the global subscriber, returning an error if one is already set.
pub fn try_init(level: &str) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_target(false)
        .try_init()
        .map_err(|e| e.to_string())
}
