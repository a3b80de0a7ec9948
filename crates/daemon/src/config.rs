// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration.
//!
//! Resolved in three layers: built-in defaults, an optional TOML file, then
//! `OB_*` environment overrides. The encryption key only ever comes from the
//! environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ob_core::DEFAULT_MAX_PARAMS_BYTES;
use ob_engine::execution::{validate_run_as, WRAPPER_MOUNT};
use ob_engine::{UnsealKey, DEFAULT_CONCURRENCY};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::env;

pub const DEFAULT_RUN_AS: &str = "65534:65534";
pub const DEFAULT_MAX_RUN_SECS: u64 = 7200;
pub const DEFAULT_LOG_IO_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_POLL_MS: u64 = 1000;

/// File name looked up in the state dir when `OB_CONFIG` is unset.
pub const CONFIG_FILE_NAME: &str = "worker.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("invalid {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("{0} must be set")]
    MissingKey(&'static str),
}

/// Optional settings read from `worker.toml`. Unset keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub storage_root: Option<PathBuf>,
    pub registry_root: Option<PathBuf>,
    pub spool_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub run_as: Option<String>,
    pub wrapper_path: Option<PathBuf>,
    pub entrypoint: Option<Vec<String>>,
    pub max_run_secs: Option<u64>,
    pub max_params_bytes: Option<usize>,
    pub log_io_timeout_ms: Option<u64>,
    pub poll_ms: Option<u64>,
}

impl FileConfig {
    /// Read and parse a config file. A missing file yields all defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved worker configuration
#[derive(Debug)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/oubliette)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to the worker's own log file
    pub log_path: PathBuf,
    /// Directory for pool activity logs
    pub logs_dir: PathBuf,
    /// Persisted metadata snapshot
    pub metadata_path: PathBuf,
    pub storage_root: PathBuf,
    pub registry_root: PathBuf,
    pub spool_dir: PathBuf,
    pub concurrency: usize,
    pub run_as: String,
    pub wrapper_path: PathBuf,
    pub entrypoint: Vec<String>,
    pub max_run: Duration,
    pub max_params_bytes: usize,
    pub log_io_timeout: Duration,
    pub poll: Duration,
    pub encryption_key: SecretString,
}

impl Config {
    /// Load configuration from the process environment and config file.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = env::state_dir()?;
        let file_path = env::var(env::CONFIG_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|| state_dir.join(CONFIG_FILE_NAME));
        let file = FileConfig::load(&file_path)?;
        Self::from_sources(state_dir, file, env::var)
    }

    /// Merge defaults, file settings and `lookup` overrides, then validate.
    pub fn from_sources(
        state_dir: PathBuf,
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let storage_root = lookup(env::STORAGE_ROOT)
            .map(PathBuf::from)
            .or(file.storage_root)
            .unwrap_or_else(|| state_dir.join("storage"));
        let registry_root = lookup(env::REGISTRY_ROOT)
            .map(PathBuf::from)
            .or(file.registry_root)
            .unwrap_or_else(|| storage_root.join("registry"));
        let spool_dir = lookup(env::SPOOL_DIR)
            .map(PathBuf::from)
            .or(file.spool_dir)
            .unwrap_or_else(|| state_dir.join("queue"));
        let wrapper_path = lookup(env::WRAPPER_PATH)
            .map(PathBuf::from)
            .or(file.wrapper_path)
            .unwrap_or_else(|| state_dir.join("secure_wrapper.py"));
        let run_as = lookup(env::RUN_AS)
            .or(file.run_as)
            .unwrap_or_else(|| DEFAULT_RUN_AS.to_string());

        let concurrency = parsed(&lookup, env::CONCURRENCY)?
            .or(file.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        let max_run_secs = parsed(&lookup, env::MAX_RUN_SECS)?
            .or(file.max_run_secs)
            .unwrap_or(DEFAULT_MAX_RUN_SECS);
        let max_params_bytes = parsed(&lookup, env::MAX_PARAMS_BYTES)?
            .or(file.max_params_bytes)
            .unwrap_or(DEFAULT_MAX_PARAMS_BYTES);
        let log_io_timeout_ms = parsed(&lookup, env::LOG_IO_TIMEOUT_MS)?
            .or(file.log_io_timeout_ms)
            .unwrap_or(DEFAULT_LOG_IO_TIMEOUT_MS);
        let poll_ms = parsed(&lookup, env::POLL_MS)?
            .or(file.poll_ms)
            .unwrap_or(DEFAULT_POLL_MS);

        let entrypoint = file
            .entrypoint
            .unwrap_or_else(|| vec!["python".to_string(), WRAPPER_MOUNT.to_string()]);

        let encryption_key = lookup(env::ENCRYPTION_KEY)
            .map(SecretString::from)
            .ok_or(ConfigError::MissingKey(env::ENCRYPTION_KEY))?;

        let config = Self {
            lock_path: state_dir.join("worker.pid"),
            log_path: ob_engine::log_paths::worker_log_path(&state_dir),
            logs_dir: ob_engine::log_paths::logs_dir(&state_dir),
            metadata_path: state_dir.join("metadata.json"),
            state_dir,
            storage_root,
            registry_root,
            spool_dir,
            concurrency,
            run_as,
            wrapper_path,
            entrypoint,
            max_run: Duration::from_secs(max_run_secs),
            max_params_bytes,
            log_io_timeout: Duration::from_millis(log_io_timeout_ms),
            poll: Duration::from_millis(poll_ms),
            encryption_key,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if self.entrypoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "entrypoint",
                message: "must not be empty".to_string(),
            });
        }
        if self.max_run.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "max_run_secs",
                message: "must be positive".to_string(),
            });
        }
        validate_run_as(&self.run_as).map_err(|e| ConfigError::InvalidValue {
            key: "run_as",
            message: e.to_string(),
        })?;
        UnsealKey::from_secret(&self.encryption_key).map_err(|e| ConfigError::InvalidValue {
            key: env::ENCRYPTION_KEY,
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
