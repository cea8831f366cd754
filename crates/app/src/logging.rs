//! Console + daily rolling file logging.

use tic_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// Installs the global subscriber.
///
/// # Logic
/// Level comes from `RUST_LOG`, `info` otherwise. Lines go to stdout and to
/// `<dir>/<file_prefix>.YYYY-MM-DD` without ANSI colors.
///
/// # Returns
/// * The file writer guard; dropping it flushes and stops file logging, so
///   it must live as long as `main`.
pub fn init_logging(cfg: &LoggingConfig) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&cfg.dir, &cfg.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}
