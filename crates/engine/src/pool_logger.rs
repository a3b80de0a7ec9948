// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-pool activity logs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log_paths;

/// Append-only logger for worker pool activity.
///
/// Writes human-readable timestamped lines to:
///   `<log_dir>/pool/<pool_name>.log`
///
/// Format: `2026-01-30T08:14:09Z [pool] message`
///
/// Each `append()` call opens, writes, and closes the file.
/// This is safe for the low write frequency of pool events.
#[derive(Debug, Clone)]
pub struct PoolLogger {
    log_dir: PathBuf,
}

impl PoolLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn path(&self, pool_name: &str) -> PathBuf {
        log_paths::pool_log_path(&self.log_dir, pool_name)
    }

    /// Append a log line for the given pool.
    ///
    /// Failures are logged via tracing but do not propagate.
    pub fn append(&self, pool_name: &str, message: &str) {
        let path = self.path(pool_name);
        if let Err(e) = write_line(&path, message) {
            tracing::warn!(
                pool_name,
                error = %e,
                "failed to write pool log"
            );
        }
    }
}

fn write_line(path: &Path, message: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    writeln!(file, "{} [pool] {}", ts, message)?;
    Ok(())
}

#[cfg(test)]
#[path = "pool_logger_tests.rs"]
mod tests;
