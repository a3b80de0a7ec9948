// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::config::ConfigError;

pub const STATE_DIR: &str = "OB_STATE_DIR";
pub const CONFIG_FILE: &str = "OB_CONFIG";
pub const STORAGE_ROOT: &str = "OB_STORAGE_ROOT";
pub const REGISTRY_ROOT: &str = "OB_REGISTRY_ROOT";
pub const SPOOL_DIR: &str = "OB_SPOOL_DIR";
pub const CONCURRENCY: &str = "OB_CONCURRENCY";
pub const RUN_AS: &str = "OB_RUN_AS";
pub const WRAPPER_PATH: &str = "OB_WRAPPER_PATH";
pub const MAX_RUN_SECS: &str = "OB_MAX_RUN_SECS";
pub const MAX_PARAMS_BYTES: &str = "OB_MAX_PARAMS_BYTES";
pub const LOG_IO_TIMEOUT_MS: &str = "OB_LOG_IO_TIMEOUT_MS";
pub const POLL_MS: &str = "OB_POLL_MS";
pub const ENCRYPTION_KEY: &str = "OB_ENCRYPTION_KEY";

/// Resolve state directory: OB_STATE_DIR > XDG_STATE_HOME/oubliette > ~/.local/state/oubliette
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var(STATE_DIR) {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("oubliette"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/oubliette"))
}

/// Read a variable, treating empty as unset.
pub fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
