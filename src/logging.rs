//! Rolling file logs.
//!
//! Logs go to `<data_dir>/logs/assign-task_*.log` so they never mix with the
//! TUI or command output. Lines are `event=<name> key=value` metadata; task
//! text and secrets are not logged.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;

const LOG_FILE_BASENAME: &str = "assign-task";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGER: OnceLock<(PathBuf, LoggerHandle)> = OnceLock::new();

/// Start file logging once per process. Later calls are no-ops.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("failed to create log directory `{}`: {e}", log_dir.display()))?;

    let handle = Logger::try_with_str(level)
        .map_err(|e| format!("invalid log level `{level}`: {e}"))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|e| format!("failed to start logger: {e}"))?;

    info!(
        "event=app_start version={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    let _ = LOGGER.set((log_dir.to_path_buf(), handle));
    Ok(())
}

/// Directory of the active log files, if logging started.
pub fn log_dir() -> Option<&'static Path> {
    LOGGER.get().map(|(dir, _)| dir.as_path())
}
