// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only input records and the model registry records.

use crate::job::JobId;
use crate::metrics::Metrics;
use crate::storage_path::StoragePath;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_ids! {
    /// Identifier of an uploaded (encrypted) training script.
    ScriptId,
    /// Identifier of an uploaded dataset.
    DatasetId,
    /// Identifier of a runtime image.
    RuntimeId,
    /// Identifier of a named model.
    ModelId,
    /// Identifier of one published model version.
    ModelVersionId,
}

/// Encrypted-at-rest training script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub id: ScriptId,
    /// Location of the sealed blob.
    pub encrypted_path: StoragePath,
    /// Hex SHA-256 of the plaintext, checked after unsealing when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_hash: Option<String>,
}

/// Plaintext dataset file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub path: StoragePath,
}

/// Pre-built image the training process runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRecord {
    pub id: RuntimeId,
    /// Image reference, e.g. `registry.local/ml-train:2024.06`.
    pub image: String,
}

/// A named model whose versions live in the artifact registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: ModelId,
    pub name: String,
}

/// Insert request for a new model version.
#[derive(Debug, Clone, PartialEq)]
pub struct NewModelVersion {
    pub model_id: ModelId,
    pub version: u32,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub job_id: JobId,
    pub metrics: Metrics,
}

/// A published, immutable model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersionRecord {
    pub id: ModelVersionId,
    pub model_id: ModelId,
    pub version: u32,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub job_id: JobId,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub created_at_ms: u64,
}

impl ModelVersionRecord {
    pub fn from_new(id: ModelVersionId, new: NewModelVersion, created_at_ms: u64) -> Self {
        Self {
            id,
            model_id: new.model_id,
            version: new.version,
            path: new.path,
            size_bytes: new.size_bytes,
            job_id: new.job_id,
            metrics: new.metrics,
            created_at_ms,
        }
    }
}
