// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    DatasetId, DatasetRecord, Hyperparameters, JobDescriptor, JobId, ModelId, ModelRecord,
    RuntimeId, RuntimeRecord, ScriptId, ScriptRecord, StoragePath,
};

// ── Descriptor factory functions ────────────────────────────────────────────

/// Descriptor for `job_id` that trains `s-1` on `d-1` in `r-1` without publishing.
pub fn descriptor(job_id: &str) -> JobDescriptor {
    JobDescriptor {
        job_id: JobId::new(job_id),
        target_model_id: None,
        target_version: None,
        hyperparameters: Hyperparameters::default(),
        script_id: ScriptId::new("s-1"),
        dataset_id: DatasetId::new("d-1"),
        runtime_id: RuntimeId::new("r-1"),
    }
}

/// Descriptor that publishes to `model_id` at `version` on success.
pub fn publishing_descriptor(job_id: &str, model_id: &str, version: u32) -> JobDescriptor {
    JobDescriptor {
        target_model_id: Some(ModelId::new(model_id)),
        target_version: Some(version),
        ..descriptor(job_id)
    }
}

// ── Record factory functions ────────────────────────────────────────────────

pub fn script_record(id: &str, encrypted_path: &str, integrity_hash: Option<&str>) -> ScriptRecord {
    ScriptRecord {
        id: ScriptId::new(id),
        encrypted_path: StoragePath::parse(encrypted_path),
        integrity_hash: integrity_hash.map(str::to_string),
    }
}

pub fn dataset_record(id: &str, path: &str) -> DatasetRecord {
    DatasetRecord {
        id: DatasetId::new(id),
        path: StoragePath::parse(path),
    }
}

pub fn runtime_record(id: &str, image: &str) -> RuntimeRecord {
    RuntimeRecord {
        id: RuntimeId::new(id),
        image: image.to_string(),
    }
}

pub fn model_record(id: &str, name: &str) -> ModelRecord {
    ModelRecord {
        id: ModelId::new(id),
        name: name.to_string(),
    }
}
