// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The metadata store seam and its in-memory implementation.

use crate::{MetadataState, Snapshot, SnapshotError};
use async_trait::async_trait;
use ob_core::{
    DatasetId, DatasetRecord, IdGen, JobId, JobRecord, JobStatus, ModelId, ModelRecord,
    ModelVersionId, ModelVersionRecord, NewModelVersion, RuntimeId, RuntimeRecord, ScriptId,
    ScriptRecord, TransitionError, UuidIdGen,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors from metadata store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Reads and writes against the durable metadata records.
///
/// The job runner touches a job record only through `mark_running`,
/// `attach_container`, `complete_job` and `mark_terminal`; everything else
/// is read-only.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn job(&self, id: &JobId) -> Result<JobRecord, StoreError>;
    async fn script(&self, id: &ScriptId) -> Result<ScriptRecord, StoreError>;
    async fn dataset(&self, id: &DatasetId) -> Result<DatasetRecord, StoreError>;
    async fn runtime(&self, id: &RuntimeId) -> Result<RuntimeRecord, StoreError>;
    async fn model(&self, id: &ModelId) -> Result<ModelRecord, StoreError>;

    /// Create the QUEUED record for a job, or return the existing one.
    async fn register_job(&self, id: &JobId, now_ms: u64) -> Result<JobRecord, StoreError>;

    async fn mark_running(
        &self,
        id: &JobId,
        log_path: &Path,
        now_ms: u64,
    ) -> Result<(), StoreError>;

    async fn attach_container(&self, id: &JobId, container_id: &str) -> Result<(), StoreError>;

    async fn mark_terminal(
        &self,
        id: &JobId,
        status: JobStatus,
        exit_code: i64,
        now_ms: u64,
    ) -> Result<(), StoreError>;

    /// Mark the job COMPLETED and record its published version atomically.
    async fn complete_job(
        &self,
        id: &JobId,
        version: Option<NewModelVersion>,
        now_ms: u64,
    ) -> Result<Option<ModelVersionRecord>, StoreError>;

    async fn insert_model_version(
        &self,
        new: NewModelVersion,
        now_ms: u64,
    ) -> Result<ModelVersionRecord, StoreError>;

    /// Published versions of a model, ascending.
    async fn model_versions(&self, model_id: &ModelId)
        -> Result<Vec<ModelVersionRecord>, StoreError>;
}

/// In-memory metadata store, optionally persisted to a snapshot file.
///
/// Every mutation is applied under one lock; the resulting state is then
/// written out if it is newer than the last snapshot on disk.
pub struct MemoryStore<G: IdGen = UuidIdGen> {
    state: Mutex<MetadataState>,
    snapshot_path: Option<PathBuf>,
    /// Sequence number of the last snapshot written.
    persisted_seq: Mutex<u64>,
    ids: G,
}

impl MemoryStore<UuidIdGen> {
    pub fn new() -> Self {
        Self::with_state(MetadataState::default(), UuidIdGen)
    }

    /// Open a snapshot-backed store, loading the snapshot if one exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = Snapshot::load(&path)?
            .map(|snapshot| snapshot.state)
            .unwrap_or_default();
        let mut store = Self::with_state(state, UuidIdGen);
        *store.persisted_seq.get_mut() = store.state.get_mut().seq;
        store.snapshot_path = Some(path);
        Ok(store)
    }
}

impl Default for MemoryStore<UuidIdGen> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGen + 'static> MemoryStore<G> {
    pub fn with_state(state: MetadataState, ids: G) -> Self {
        Self {
            state: Mutex::new(state),
            snapshot_path: None,
            persisted_seq: Mutex::new(0),
            ids,
        }
    }

    /// Copy of the current state.
    pub fn state(&self) -> MetadataState {
        self.state.lock().clone()
    }

    /// Apply seed records (scripts, datasets, ...) outside the job lifecycle.
    pub fn seed(&self, f: impl FnOnce(&mut MetadataState)) {
        let _ = self.mutate(|state| {
            f(state);
            state.seq += 1;
            Ok(())
        });
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&MetadataState) -> Result<&T, StoreError>,
    ) -> Result<T, StoreError>
    where
        T: Clone,
    {
        f(&self.state.lock()).cloned()
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut MetadataState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let (out, snapshot) = {
            let mut state = self.state.lock();
            let before = state.seq;
            let out = f(&mut state)?;
            let changed = state.seq != before;
            let snapshot = (changed && self.snapshot_path.is_some()).then(|| state.clone());
            (out, snapshot)
        };
        if let Some(state) = snapshot {
            self.persist(state);
        }
        Ok(out)
    }

    fn persist(&self, state: MetadataState) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let mut persisted = self.persisted_seq.lock();
        if state.seq <= *persisted {
            return;
        }
        let seq = state.seq;
        match Snapshot::new(state).save(path) {
            Ok(()) => *persisted = seq,
            Err(e) => warn!(
                error = %e,
                path = %path.display(),
                seq,
                "failed to persist metadata snapshot",
            ),
        }
    }
}

#[async_trait]
impl<G: IdGen + 'static> MetadataStore for MemoryStore<G> {
    async fn job(&self, id: &JobId) -> Result<JobRecord, StoreError> {
        self.read(|s| s.job(id.as_str()))
    }

    async fn script(&self, id: &ScriptId) -> Result<ScriptRecord, StoreError> {
        self.read(|s| s.script(id.as_str()))
    }

    async fn dataset(&self, id: &DatasetId) -> Result<DatasetRecord, StoreError> {
        self.read(|s| s.dataset(id.as_str()))
    }

    async fn runtime(&self, id: &RuntimeId) -> Result<RuntimeRecord, StoreError> {
        self.read(|s| s.runtime(id.as_str()))
    }

    async fn model(&self, id: &ModelId) -> Result<ModelRecord, StoreError> {
        self.read(|s| s.model(id.as_str()))
    }

    async fn register_job(&self, id: &JobId, now_ms: u64) -> Result<JobRecord, StoreError> {
        self.mutate(|s| Ok(s.register_job(id, now_ms)))
    }

    async fn mark_running(
        &self,
        id: &JobId,
        log_path: &Path,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        self.mutate(|s| s.mark_running(id, log_path.to_path_buf(), now_ms))
    }

    async fn attach_container(&self, id: &JobId, container_id: &str) -> Result<(), StoreError> {
        self.mutate(|s| s.attach_container(id, container_id.to_string()))
    }

    async fn mark_terminal(
        &self,
        id: &JobId,
        status: JobStatus,
        exit_code: i64,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        self.mutate(|s| s.mark_terminal(id, status, exit_code, now_ms))
    }

    async fn complete_job(
        &self,
        id: &JobId,
        version: Option<NewModelVersion>,
        now_ms: u64,
    ) -> Result<Option<ModelVersionRecord>, StoreError> {
        let version = version.map(|new| (ModelVersionId::new(self.ids.generate()), new));
        self.mutate(|s| s.complete_job(id, version, now_ms))
    }

    async fn insert_model_version(
        &self,
        new: NewModelVersion,
        now_ms: u64,
    ) -> Result<ModelVersionRecord, StoreError> {
        let id = ModelVersionId::new(self.ids.generate());
        self.mutate(|s| s.insert_model_version(id, new, now_ms))
    }

    async fn model_versions(
        &self,
        model_id: &ModelId,
    ) -> Result<Vec<ModelVersionRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .versions_of(model_id.as_str())
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
