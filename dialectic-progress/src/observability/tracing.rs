//! Subscriber installation and run-scoped spans.

use crate::config::LoggingConfig;
use crate::core::ProgressKey;
use crate::errors::ProgressError;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. Output is JSON lines when
/// `config.json` is true, human-readable otherwise.
///
/// # Errors
///
/// Returns `ProgressError::Config` if the filter directive is invalid or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ProgressError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ProgressError::Config(format!("invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    installed.map_err(|e| ProgressError::Config(format!("tracing already initialised: {e}")))
}

/// Opens a span scoped to one stage run.
#[must_use]
pub fn run_span(progress_key: &ProgressKey) -> Span {
    tracing::debug_span!(
        "stage_run",
        progress_key = %progress_key,
        session_id = %progress_key.session_id,
        stage_slug = %progress_key.stage_slug,
        iteration = progress_key.iteration_number,
    )
}
