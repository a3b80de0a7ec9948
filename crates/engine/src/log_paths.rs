// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared path builders for the worker's own log files.
//!
//! Used by the pool logger and the daemon so both agree on:
//!   `<state_dir>/worker.log`
//!   `<state_dir>/logs/pool/<pool_name>.log`

use std::path::{Path, PathBuf};

/// Build the path to the daemon's diagnostic log.
///
/// Structure: `{state_dir}/worker.log`
pub fn worker_log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("worker.log")
}

/// Build the path to the activity log directory.
///
/// Structure: `{state_dir}/logs`
pub fn logs_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("logs")
}

/// Build the path to a pool's activity log file.
///
/// Structure: `{logs_dir}/pool/{pool_name}.log`
///
/// # Arguments
/// * `logs_dir` - Base logs directory (e.g., `~/.local/state/oubliette/logs`)
/// * `pool_name` - Pool name
pub fn pool_log_path(logs_dir: &Path, pool_name: &str) -> PathBuf {
    logs_dir.join("pool").join(format!("{}.log", pool_name))
}

#[cfg(test)]
#[path = "log_paths_tests.rs"]
mod tests;
