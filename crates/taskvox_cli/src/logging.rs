use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub const LOG_ENV_VAR: &str = "TASKVOX_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Filter directive in effect: `TASKVOX_LOG`, then the configured filter, then `warn`.
pub fn resolve_filter(configured: Option<&str>) -> String {
    if let Ok(value) = std::env::var(LOG_ENV_VAR)
        && !value.trim().is_empty()
    {
        return value.trim().to_string();
    }

    configured
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the stderr subscriber. Later calls are ignored.
pub fn init_logging(configured: Option<&str>) {
    let directive = resolve_filter(configured);
    let subscriber = tracing_subscriber::registry().with(build_filter(&directive)).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true),
    );

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::debug!(target: "taskvox::cli", filter = %directive, "logging initialized");
    }
}
