// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized metadata: every record the worker reads or writes.

use crate::StoreError;
use ob_core::{
    DatasetRecord, JobId, JobRecord, JobStatus, ModelRecord, ModelVersionId, ModelVersionRecord,
    NewModelVersion, RuntimeRecord, ScriptRecord, TransitionError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// All metadata records, keyed by ID.
///
/// `seq` increases on every mutation so persisted snapshots can be ordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataState {
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub jobs: HashMap<String, JobRecord>,
    #[serde(default)]
    pub scripts: HashMap<String, ScriptRecord>,
    #[serde(default)]
    pub datasets: HashMap<String, DatasetRecord>,
    #[serde(default)]
    pub runtimes: HashMap<String, RuntimeRecord>,
    #[serde(default)]
    pub models: HashMap<String, ModelRecord>,
    #[serde(default)]
    pub model_versions: HashMap<String, ModelVersionRecord>,
}

fn not_found(kind: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

impl MetadataState {
    pub fn job(&self, id: &str) -> Result<&JobRecord, StoreError> {
        self.jobs.get(id).ok_or_else(|| not_found("job", id))
    }

    pub fn script(&self, id: &str) -> Result<&ScriptRecord, StoreError> {
        self.scripts.get(id).ok_or_else(|| not_found("script", id))
    }

    pub fn dataset(&self, id: &str) -> Result<&DatasetRecord, StoreError> {
        self.datasets.get(id).ok_or_else(|| not_found("dataset", id))
    }

    pub fn runtime(&self, id: &str) -> Result<&RuntimeRecord, StoreError> {
        self.runtimes.get(id).ok_or_else(|| not_found("runtime", id))
    }

    pub fn model(&self, id: &str) -> Result<&ModelRecord, StoreError> {
        self.models.get(id).ok_or_else(|| not_found("model", id))
    }

    /// Versions published for a model, ascending by version number.
    pub fn versions_of(&self, model_id: &str) -> Vec<&ModelVersionRecord> {
        let mut versions: Vec<_> = self
            .model_versions
            .values()
            .filter(|v| v.model_id == model_id)
            .collect();
        versions.sort_by_key(|v| v.version);
        versions
    }

    /// Create a QUEUED record unless one already exists. Returns the current record.
    pub fn register_job(&mut self, id: &JobId, now_ms: u64) -> JobRecord {
        if let Some(existing) = self.jobs.get(id.as_str()) {
            return existing.clone();
        }
        let record = JobRecord::queued(id.clone(), now_ms);
        self.jobs.insert(id.to_string(), record.clone());
        self.seq += 1;
        record
    }

    pub fn mark_running(
        &mut self,
        id: &JobId,
        log_path: PathBuf,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let job = self
            .jobs
            .get_mut(id.as_str())
            .ok_or_else(|| not_found("job", id.as_str()))?;
        job.start(log_path, now_ms)?;
        self.seq += 1;
        Ok(())
    }

    pub fn attach_container(&mut self, id: &JobId, container_id: String) -> Result<(), StoreError> {
        let job = self
            .jobs
            .get_mut(id.as_str())
            .ok_or_else(|| not_found("job", id.as_str()))?;
        job.attach_container(container_id)?;
        self.seq += 1;
        Ok(())
    }

    pub fn mark_terminal(
        &mut self,
        id: &JobId,
        status: JobStatus,
        exit_code: i64,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let job = self
            .jobs
            .get_mut(id.as_str())
            .ok_or_else(|| not_found("job", id.as_str()))?;
        job.finish(status, exit_code, now_ms)?;
        self.seq += 1;
        Ok(())
    }

    /// RUNNING -> COMPLETED, recording the published version (if any) in the
    /// same step.
    ///
    /// Every check runs before anything is changed, so on error neither the
    /// job nor the version table has moved.
    pub fn complete_job(
        &mut self,
        id: &JobId,
        version: Option<(ModelVersionId, NewModelVersion)>,
        now_ms: u64,
    ) -> Result<Option<ModelVersionRecord>, StoreError> {
        let job = self.job(id.as_str())?;
        if !job.status.can_transition_to(JobStatus::Completed) {
            return Err(TransitionError::Illegal {
                job_id: id.clone(),
                from: job.status,
                to: JobStatus::Completed,
            }
            .into());
        }
        let record = match version {
            Some((version_id, new)) => Some(self.insert_model_version(version_id, new, now_ms)?),
            None => None,
        };
        self.mark_terminal(id, JobStatus::Completed, 0, now_ms)?;
        Ok(record)
    }

    /// Insert a model version.
    ///
    /// Rejects a second version for the same job and a duplicate
    /// `(model, version)` pair; published versions are immutable.
    pub fn insert_model_version(
        &mut self,
        id: ModelVersionId,
        new: NewModelVersion,
        now_ms: u64,
    ) -> Result<ModelVersionRecord, StoreError> {
        self.model(new.model_id.as_str())?;
        if let Some(existing) = self.model_versions.values().find(|v| v.job_id == new.job_id) {
            return Err(StoreError::Conflict(format!(
                "job {} already published version {} of model {}",
                new.job_id, existing.version, existing.model_id
            )));
        }
        if self
            .model_versions
            .values()
            .any(|v| v.model_id == new.model_id && v.version == new.version)
        {
            return Err(StoreError::Conflict(format!(
                "model {} already has version {}",
                new.model_id, new.version
            )));
        }
        let record = ModelVersionRecord::from_new(id, new, now_ms);
        self.model_versions
            .insert(record.id.to_string(), record.clone());
        self.seq += 1;
        Ok(record)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
