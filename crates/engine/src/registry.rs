// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact registry: immutable, versioned copies of job outputs.
//!
//! Structure: `<registry_root>/<model_dir_name>/v<version>/`
//!
//! A publish copies into a private directory under `.staging/`, claims the
//! version with an exclusive `create_dir`, then renames the staged tree over
//! its own empty claim. Whoever loses the `create_dir` gets
//! [`PublishError::VersionExists`] and never touches the version directory.

use ob_core::{model_dir_name, ModelRecord};
use ob_storage::StoreError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scratch space for in-flight copies, inside the registry root so the final
/// rename stays on one filesystem.
pub const STAGING_DIR: &str = ".staging";

/// Errors from publishing a successful run
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("version {version} of model {model} already exists at {}", path.display())]
    VersionExists {
        model: String,
        version: u32,
        path: PathBuf,
    },
    #[error("copy into registry failed at {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("registry task failed: {0}")]
    Task(String),
    #[error("model version record failed: {0}")]
    Record(#[from] StoreError),
}

/// A version directory populated by [`ArtifactRegistry::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub path: PathBuf,
    /// Sum of the sizes of every file copied.
    pub size_bytes: u64,
    pub files: usize,
}

#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    root: PathBuf,
}

impl ArtifactRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, model: &ModelRecord, version: u32) -> PathBuf {
        self.root
            .join(model_dir_name(&model.name, model.id.as_str()))
            .join(format!("v{}", version))
    }

    /// Copy the tree under `source` into the model's version directory.
    ///
    /// A version directory that already exists is never written to, empty or
    /// not. On any failure the staged copy and this call's claim are removed.
    pub async fn publish(
        &self,
        source: &Path,
        model: &ModelRecord,
        version: u32,
    ) -> Result<PublishedArtifact, PublishError> {
        let target = self.version_dir(model, version);
        let staging = self.root.join(STAGING_DIR).join(format!(
            "{}-v{}-{:016x}",
            model_dir_name(&model.name, model.id.as_str()),
            version,
            rand::random::<u64>()
        ));
        let source = source.to_path_buf();
        let model_name = model.name.clone();
        tokio::task::spawn_blocking(move || {
            publish_blocking(&source, &staging, &target, model_name, version)
        })
        .await
        .map_err(|e| PublishError::Task(e.to_string()))?
    }
}

fn publish_blocking(
    source: &Path,
    staging: &Path,
    target: &Path,
    model: String,
    version: u32,
) -> Result<PublishedArtifact, PublishError> {
    let copy_err = |path: &Path, source: io::Error| PublishError::Copy {
        path: path.to_path_buf(),
        source,
    };

    let mut totals = Totals::default();
    if let Err(e) = copy_tree(source, staging, &mut totals) {
        discard(staging);
        return Err(e);
    }

    if let Some(parent) = target.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            discard(staging);
            return Err(copy_err(parent, e));
        }
    }
    match fs::create_dir(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            discard(staging);
            return Err(PublishError::VersionExists {
                model,
                version,
                path: target.to_path_buf(),
            });
        }
        Err(e) => {
            discard(staging);
            return Err(copy_err(target, e));
        }
    }

    // Replaces our own empty claim in one step.
    if let Err(e) = fs::rename(staging, target) {
        discard(staging);
        if let Err(cleanup) = fs::remove_dir(target) {
            tracing::warn!(path = %target.display(), error = %cleanup, "failed to release version claim");
        }
        return Err(copy_err(target, e));
    }

    Ok(PublishedArtifact {
        path: target.to_path_buf(),
        size_bytes: totals.bytes,
        files: totals.files,
    })
}

fn discard(staging: &Path) {
    match fs::remove_dir_all(staging) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %staging.display(), error = %e, "failed to remove staged copy")
        }
    }
}

#[derive(Default)]
struct Totals {
    bytes: u64,
    files: usize,
}

/// Recursive copy that never follows symlinks.
fn copy_tree(src: &Path, dst: &Path, totals: &mut Totals) -> Result<(), PublishError> {
    let copy_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PublishError::Copy { path, source }
    };

    fs::create_dir_all(dst).map_err(copy_err(dst))?;
    for entry in fs::read_dir(src).map_err(copy_err(src))? {
        let entry = entry.map_err(copy_err(src))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(copy_err(&from))?;

        if file_type.is_symlink() {
            tracing::warn!(path = %from.display(), "skipping symlink in job outputs");
        } else if file_type.is_dir() {
            copy_tree(&from, &to, totals)?;
        } else if file_type.is_file() {
            totals.bytes += fs::copy(&from, &to).map_err(copy_err(&from))?;
            totals.files += 1;
        } else {
            tracing::warn!(path = %from.display(), "skipping special file in job outputs");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
