// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence manifest written into the sandbox after a successful run.
//!
//! It ties the job's inputs to a hash of the audit log so the run can be
//! checked after the fact. It lives next to the audit log, not in the
//! published outputs.

use crate::sandbox::{Sandbox, SandboxError, AUDIT_LOG_FILE};
use crate::unseal::sha256_hex;
use chrono::{DateTime, Utc};
use ob_core::{DatasetId, JobDescriptor, JobId, JobStatus, ScriptId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestIntegrity {
    pub log_file_name: String,
    /// Hex SHA-256 of the audit log at the time the manifest was written.
    pub log_sha256: String,
    /// Hex SHA-256 of the decrypted script.
    pub script_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceManifest {
    pub job_id: JobId,
    pub timestamp: DateTime<Utc>,
    pub script_id: ScriptId,
    pub dataset_id: DatasetId,
    pub status: JobStatus,
    pub integrity: ManifestIntegrity,
}

impl EvidenceManifest {
    pub fn new(
        descriptor: &JobDescriptor,
        audit_log: &[u8],
        script_sha256: String,
        epoch_ms: u64,
    ) -> Self {
        Self {
            job_id: descriptor.job_id.clone(),
            timestamp: DateTime::from_timestamp_millis(epoch_ms as i64).unwrap_or_default(),
            script_id: descriptor.script_id.clone(),
            dataset_id: descriptor.dataset_id.clone(),
            status: JobStatus::Completed,
            integrity: ManifestIntegrity {
                log_file_name: AUDIT_LOG_FILE.to_string(),
                log_sha256: sha256_hex(audit_log),
                script_sha256,
            },
        }
    }
}

/// Hash the sandbox's audit log as it stands and write `manifest.json`.
pub async fn write_manifest(
    sandbox: &Sandbox,
    descriptor: &JobDescriptor,
    script_sha256: String,
    epoch_ms: u64,
) -> Result<(EvidenceManifest, PathBuf), SandboxError> {
    let log_path = sandbox.audit_log_path();
    let audit = tokio::fs::read(&log_path)
        .await
        .map_err(|source| SandboxError::Io {
            path: log_path,
            source,
        })?;
    let manifest = EvidenceManifest::new(descriptor, &audit, script_sha256, epoch_ms);

    let path = sandbox.manifest_path();
    let io_err = |source| SandboxError::Io {
        path: path.clone(),
        source,
    };
    let json = serde_json::to_vec_pretty(&manifest).map_err(|e| io_err(e.into()))?;
    tokio::fs::write(&path, json).await.map_err(io_err)?;
    Ok((manifest, path))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
