use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name prefix; files are named `prh_sync.<date>.log`.
pub const LOG_FILE_PREFIX: &str = "prh_sync";
/// Rotated files kept on disk.
pub const MAX_LOG_FILES: usize = 7;

/// Builds the filter: `RUST_LOG` when set and valid, else `log_level`.
pub fn build_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .with_context(|| format!("invalid log level '{log_level}'"))
}

/// Installs the global subscriber: console output plus a daily rotating JSON file.
///
/// Keep the returned guard alive until exit, dropping it flushes the file writer.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .context("creating rolling log file")?;
    let (writer, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);
    let file_layer = fmt::layer().with_ansi(false).with_writer(writer).json();

    tracing_subscriber::registry()
        .with(build_filter(log_level)?)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    info!(log_dir = %log_dir.display(), log_level, "Logging initialized");
    Ok(guard)
}
