//! File-based logging
//!
//! The terminal belongs to the interface, so tracing output goes to a daily
//! rotated file under `.logs/` instead of stdout.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "mpdterm";
const DEFAULT_FILTER: &str = "mpdterm=debug,warn";

/// Initialize the logging system.
///
/// Logs are written to `.logs/mpdterm.YYYY-MM-DD` with daily rotation. The
/// level can be controlled via the `RUST_LOG` environment variable; by
/// default this crate logs at DEBUG and everything else at WARN.
///
/// The returned guard flushes the writer when dropped, so keep it alive
/// until the program exits.
pub fn init_logging() -> anyhow::Result<WorkerGuard> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(dir = LOG_DIR, "Logging initialized");
    Ok(guard)
}
