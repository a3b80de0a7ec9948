// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job sandbox directories.
//!
//! Layout under the storage root:
//!
//! ```text
//! <storage_root>/sandboxes/<job_id>/
//!   audit.log        append-only job output
//!   user_model.py    decrypted script (exists only while the container runs)
//!   manifest.json    evidence manifest, written on success
//!   outputs/         the container's only writable mount
//! ```

use ob_core::{is_path_component, JobId, StoragePath, StoragePathError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SANDBOXES_DIR: &str = "sandboxes";
pub const AUDIT_LOG_FILE: &str = "audit.log";
pub const SCRIPT_FILE: &str = "user_model.py";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const OUTPUTS_DIR: &str = "outputs";

/// Errors from sandbox operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("job id {0:?} cannot name a sandbox directory")]
    InvalidJobId(String),
    #[error("{kind} file missing: {}", path.display())]
    MissingInput { kind: &'static str, path: PathBuf },
    #[error("{kind} path invalid: {source}")]
    InvalidPath {
        kind: &'static str,
        #[source]
        source: StoragePathError,
    },
    #[error("sandbox io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SandboxError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SandboxError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A job's working directory. Paths only; nothing here touches the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    job_id: JobId,
    root: PathBuf,
}

impl Sandbox {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join(AUDIT_LOG_FILE)
    }

    pub fn script_path(&self) -> PathBuf {
        self.root.join(SCRIPT_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }
}

/// Allocates sandboxes and resolves stored input paths against the storage root.
#[derive(Debug, Clone)]
pub struct SandboxManager {
    storage_root: PathBuf,
}

impl SandboxManager {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Deterministic sandbox path for a job.
    pub fn sandbox_for(&self, job_id: &JobId) -> Result<Sandbox, SandboxError> {
        if !is_path_component(job_id.as_str()) {
            return Err(SandboxError::InvalidJobId(job_id.to_string()));
        }
        Ok(Sandbox {
            job_id: job_id.clone(),
            root: self.storage_root.join(SANDBOXES_DIR).join(job_id.as_str()),
        })
    }

    /// Create a fresh sandbox, discarding anything a previous attempt left behind.
    pub async fn create_sandbox(&self, job_id: &JobId) -> Result<Sandbox, SandboxError> {
        let sandbox = self.sandbox_for(job_id)?;
        self.prepare(sandbox).await
    }

    /// Lay out the directories for `sandbox`, clearing any stale contents.
    ///
    /// Only call this once the job's record has been claimed.
    pub async fn prepare(&self, sandbox: Sandbox) -> Result<Sandbox, SandboxError> {
        match tokio::fs::remove_dir_all(sandbox.root()).await {
            Ok(()) => {
                tracing::warn!(job_id = %sandbox.job_id(), path = %sandbox.root().display(), "replaced stale sandbox");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SandboxError::io(sandbox.root(), e)),
        }
        let outputs = sandbox.outputs_dir();
        tokio::fs::create_dir_all(&outputs)
            .await
            .map_err(|e| SandboxError::io(&outputs, e))?;
        Ok(sandbox)
    }

    /// Resolve a stored input path and check that it exists on disk.
    pub async fn resolve_input_path(
        &self,
        kind: &'static str,
        path: &StoragePath,
    ) -> Result<PathBuf, SandboxError> {
        resolve_input_path(kind, path, &self.storage_root).await
    }

    /// Write decrypted script bytes into the sandbox.
    pub async fn write_secret(
        &self,
        sandbox: &Sandbox,
        plaintext: &[u8],
    ) -> Result<PathBuf, SandboxError> {
        let path = sandbox.script_path();
        tokio::fs::write(&path, plaintext)
            .await
            .map_err(|e| SandboxError::io(&path, e))?;
        Ok(path)
    }

    /// Best-effort delete of a decrypted script. Returns whether the file is gone.
    pub async fn destroy_secret(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to destroy decrypted script");
                false
            }
        }
    }
}

/// Normalize a stored path to an absolute one and require the file to exist.
pub async fn resolve_input_path(
    kind: &'static str,
    path: &StoragePath,
    storage_root: &Path,
) -> Result<PathBuf, SandboxError> {
    let resolved = path
        .resolve(storage_root)
        .map_err(|source| SandboxError::InvalidPath { kind, source })?;
    match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_file() => Ok(resolved),
        Ok(_) => Err(SandboxError::MissingInput {
            kind,
            path: resolved,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SandboxError::MissingInput {
            kind,
            path: resolved,
        }),
        Err(e) => Err(SandboxError::io(&resolved, e)),
    }
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
