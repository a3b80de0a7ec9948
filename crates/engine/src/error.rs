// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for one job run

use crate::execution::ExecutionError;
use crate::log_mux::LogError;
use crate::registry::PublishError;
use crate::sandbox::SandboxError;
use crate::unseal::UnsealError;
use ob_core::HyperparameterError;
use ob_storage::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Exit code recorded for failures that never produced a process exit code.
pub const FAILURE_EXIT_CODE: i64 = 1;

/// Everything that can fail a job. Each variant ends the run in FAILED.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("missing input: {0}")]
    MissingInput(#[source] SandboxError),
    #[error("decryption failed: {0}")]
    Decryption(#[from] UnsealError),
    #[error("execution setup failed: {0}")]
    ExecutionSetup(#[source] ExecutionError),
    #[error("training process exited with code {code}")]
    NonZeroExit { code: i64 },
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error("sandbox io failed: {0}")]
    Io(String),
    #[error("metadata store failed: {0}")]
    Store(#[source] StoreError),
    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: &'static str, id: String },
    #[error("invalid hyperparameters: {0}")]
    InvalidHyperparameters(#[from] HyperparameterError),
    #[error("execution exceeded the {}s time limit", .0.as_secs())]
    TimedOut(Duration),
    #[error("job cancelled")]
    Cancelled,
}

impl JobError {
    /// Whether the failure came from the worker's environment rather than the
    /// job's own inputs or training code.
    ///
    /// Nothing retries today; this only feeds logging.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            JobError::ExecutionSetup(_)
            | JobError::Io(_)
            | JobError::Store(_)
            | JobError::Publish(_)
            | JobError::Cancelled => true,
            JobError::MissingInput(_)
            | JobError::Decryption(_)
            | JobError::NonZeroExit { .. }
            | JobError::RecordNotFound { .. }
            | JobError::InvalidHyperparameters(_)
            | JobError::TimedOut(_) => false,
        }
    }

    /// Exit code to record on the job: the real one for a nonzero exit.
    pub fn exit_code(&self) -> i64 {
        match self {
            JobError::NonZeroExit { code } => *code,
            _ => FAILURE_EXIT_CODE,
        }
    }
}

impl From<SandboxError> for JobError {
    fn from(e: SandboxError) -> Self {
        match e {
            SandboxError::MissingInput { .. } | SandboxError::InvalidPath { .. } => {
                JobError::MissingInput(e)
            }
            SandboxError::InvalidJobId(_) | SandboxError::Io { .. } => JobError::Io(e.to_string()),
        }
    }
}

impl From<ExecutionError> for JobError {
    fn from(e: ExecutionError) -> Self {
        match e {
            ExecutionError::TimedOut(limit) => JobError::TimedOut(limit),
            ExecutionError::Cancelled => JobError::Cancelled,
            ExecutionError::Log(e) => JobError::from(e),
            ExecutionError::PrivilegedIdentity(_)
            | ExecutionError::Setup(_)
            | ExecutionError::Wait(_) => JobError::ExecutionSetup(e),
        }
    }
}

impl From<LogError> for JobError {
    fn from(e: LogError) -> Self {
        JobError::Io(e.to_string())
    }
}

impl From<StoreError> for JobError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => JobError::RecordNotFound { kind, id },
            other => JobError::Store(other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
