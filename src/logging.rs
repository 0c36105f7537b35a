//! Logging setup
//!
//! Structured logging through `tracing`, written to stderr so stdout stays
//! reserved for the run summary and the JSON report.

use crate::types::SyncError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding a filter directive, e.g. `treesync=trace`
pub const LOG_ENV_VAR: &str = "TREESYNC_LOG";

/// Initialize the global subscriber
///
/// Priority order (highest to lowest):
/// 1. `TREESYNC_LOG`
/// 2. `debug` when `verbose` is set
/// 3. `warn`
///
/// Calling this more than once is harmless; later calls leave the installed
/// subscriber in place.
pub fn init_logging(verbose: bool) -> Result<(), SyncError> {
    let filter = build_env_filter(std::env::var(LOG_ENV_VAR).ok().as_deref(), verbose)?;

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(console::Term::stderr().features().colors_supported());

    if Registry::default().with(filter).with(layer).try_init().is_err() {
        tracing::debug!("logging already initialized");
    }
    Ok(())
}

fn build_env_filter(directive: Option<&str>, verbose: bool) -> Result<EnvFilter, SyncError> {
    match directive.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive).map_err(|e| {
            SyncError::Config(format!("invalid {} value '{}': {}", LOG_ENV_VAR, directive, e))
        }),
        None if verbose => Ok(EnvFilter::new("debug")),
        None => Ok(EnvFilter::new("warn")),
    }
}
