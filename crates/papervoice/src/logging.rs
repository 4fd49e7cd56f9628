//! Process-wide logging setup for embedding binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the tracing subscriber with an env-controlled filter
/// (`RUST_LOG`, defaulting to `info`) and bridges `log` macros into the
/// same subscriber. Safe to call more than once; only the first call
/// takes effect.
pub fn init_logging() {
    if tracing_log::LogTracer::init().is_err() {
        // A subscriber is already installed.
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
