//! Diagnostic log setup for the binary.

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// Builds the filter from `--log-level`, else `RUST_LOG`, else `warn`.
/// An unparsable directive falls back to `warn` instead of failing startup.
pub fn log_filter(log_level: Option<&str>) -> EnvFilter {
    let filter = match log_level {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

pub fn init_tracing(log_level: Option<&str>) {
    // Stdout belongs to the conversation; diagnostics go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
