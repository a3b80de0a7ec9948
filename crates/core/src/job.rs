// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptor, durable job record, and the job status state machine.

use crate::hyperparams::Hyperparameters;
use crate::records::{DatasetId, ModelId, RuntimeId, ScriptId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

crate::define_ids! {
    /// Unique identifier for a training job.
    ///
    /// Keys the job's sandbox directory, audit log, and live log channel.
    JobId,
}

/// One unit of work delivered by the queue. Immutable once enqueued.
///
/// Field names follow the queue's JSON wire format (`jobId`, `scriptId`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_model_id: Option<ModelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<u32>,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
    pub script_id: ScriptId,
    pub dataset_id: DatasetId,
    pub runtime_id: RuntimeId,
}

impl JobDescriptor {
    /// The model + version to publish to, when both are named.
    pub fn publish_target(&self) -> Option<(&ModelId, u32)> {
        match (&self.target_model_id, self.target_version) {
            (Some(model), Some(version)) => Some((model, version)),
            _ => None,
        }
    }

    /// True when exactly one of model/version is set; such a job never publishes.
    pub fn has_partial_target(&self) -> bool {
        self.target_model_id.is_some() != self.target_version.is_some()
    }
}

/// Lifecycle status of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal edge of the state machine.
    ///
    /// ```text
    /// QUEUED ─► RUNNING ─► COMPLETED
    ///    │         │
    ///    └─────────┴─────► FAILED
    /// ```
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "QUEUED"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Rejected job record mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job {job_id}: illegal transition {from} -> {to}")]
    Illegal {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("job {job_id}: container can only be attached while RUNNING (status {status})")]
    NotRunning { job_id: JobId, status: JobStatus },
}

/// Durable job record, owned by the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

impl JobRecord {
    /// A freshly enqueued record.
    pub fn queued(id: JobId, created_at_ms: u64) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            exit_code: None,
            log_path: None,
            container_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// QUEUED -> RUNNING, recording the audit log path.
    pub fn start(&mut self, log_path: PathBuf, now_ms: u64) -> Result<(), TransitionError> {
        self.check(JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.started_at_ms = Some(now_ms);
        self.log_path = Some(log_path);
        Ok(())
    }

    /// Record the isolated process backing this run.
    pub fn attach_container(&mut self, container_id: String) -> Result<(), TransitionError> {
        if self.status != JobStatus::Running {
            return Err(TransitionError::NotRunning {
                job_id: self.id.clone(),
                status: self.status,
            });
        }
        self.container_id = Some(container_id);
        Ok(())
    }

    /// Enter a terminal state.
    ///
    /// `status` must be COMPLETED or FAILED; anything else is rejected as an
    /// illegal transition.
    pub fn finish(
        &mut self,
        status: JobStatus,
        exit_code: i64,
        now_ms: u64,
    ) -> Result<(), TransitionError> {
        self.check(status)?;
        self.status = status;
        self.exit_code = Some(exit_code);
        self.completed_at_ms = Some(now_ms);
        Ok(())
    }

    fn check(&self, next: JobStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::Illegal {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            })
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
