//! Tracing subscriber setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vkrpc_domain::{ApiError, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
/// Returns `ApiError::Config` if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(false)).try_init(),
    };

    installed.map_err(|e| ApiError::Config(format!("tracing subscriber already installed: {e}")))
}
