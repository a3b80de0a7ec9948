// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque hyperparameter payload passed through to the training process.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default upper bound for the serialized payload (64 KiB).
pub const DEFAULT_MAX_PARAMS_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum HyperparameterError {
    #[error("hyperparameters serialize to {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("hyperparameters could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key/value hyperparameters. Values are not interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters(Map<String, Value>);

impl Hyperparameters {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Serialize to the compact JSON string handed to the process, enforcing
    /// a byte limit.
    ///
    /// The same string goes into both argv and the environment, so it is
    /// serialized exactly once. `serde_json` escapes control characters,
    /// which keeps the result free of NUL bytes.
    pub fn to_payload(&self, limit: usize) -> Result<String, HyperparameterError> {
        let payload = serde_json::to_string(&self.0)?;
        if payload.len() > limit {
            return Err(HyperparameterError::TooLarge {
                size: payload.len(),
                limit,
            });
        }
        Ok(payload)
    }
}

impl From<Map<String, Value>> for Hyperparameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
#[path = "hyperparams_tests.rs"]
mod tests;
