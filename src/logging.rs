//! Logging setup for the `nestcast` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to the binary.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a stderr subscriber filtered at `level` for this crate.
///
/// `RUST_LOG`, when set, replaces the default filter.
pub fn init_logging(level: &str) -> Result<(), TryInitError> {
    let default_filter = format!("nestcast={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init()
}
