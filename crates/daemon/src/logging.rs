// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker diagnostic log: startup marker, size-based rotation, subscriber.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- obd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- obd: starting (pid: ";

/// Rotate once the log grows past this many bytes.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated files kept (`worker.log.1` .. `worker.log.N`).
pub const MAX_ROTATIONS: u32 = 3;

/// Append the startup marker, creating the log directory if needed.
pub fn write_startup_marker(log_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())
}

/// Write a startup error synchronously; the non-blocking writer may not flush
/// before the process exits.
pub fn write_startup_error(log_path: &Path, error: &dyn std::fmt::Display) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start worker: {}", error);
}

/// Shift `log.1..log.N` up by one and move an oversized log to `log.1`.
///
/// Best-effort: rotation failures leave the log where it is.
pub fn rotate_log_if_needed(log_path: &Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }
    for n in (1..MAX_ROTATIONS).rev() {
        let from = rotated(log_path, n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(log_path, n + 1));
        }
    }
    let _ = std::fs::rename(log_path, rotated(log_path, 1));
}

fn rotated(log_path: &Path, n: u32) -> PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(format!(".{}", n));
    PathBuf::from(name)
}

/// Install the global subscriber writing to `log_path`.
///
/// `RUST_LOG` overrides the default `info` filter. Keep the returned guard
/// alive for the life of the process or buffered lines are lost.
pub fn setup_logging(log_path: &Path) -> std::io::Result<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = log_path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "log path has no file name")
    })?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
