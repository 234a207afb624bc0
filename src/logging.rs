// Logging init: every event goes to stderr and to a log file; if the file
// can't be opened the caller falls back to stderr alone. Stdout is left to
// the JSON summary.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILE: &str = "file_uploader.log";

/// Hands out the shared append-mode handle; `&File` writes directly so no
/// per-event clone is needed.
struct LogFile(fs::File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = &'a fs::File;

    fn make_writer(&'a self) -> Self::Writer {
        &self.0
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr and append to `log_path`.
/// Returns Err if the file can't be opened so the caller can fall back.
pub fn init_logging(log_path: &Path, verbose: bool) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("cannot open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(io::stderr.and(LogFile(file)))
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;

    tracing::debug!("logging to {}", log_path.display());
    Ok(())
}

/// Console-only logging. Use when init_logging() fails so the run can go on.
pub fn init_logging_console(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .try_init();
}
