// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk copy of the metadata state.
//!
//! One JSON document, replaced atomically (tmp file, fsync, rename). The
//! document carries the state's mutation sequence so the store can skip
//! writes that would not advance it.

use crate::MetadataState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Layout version written by this build.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Corrupt snapshots kept beside the live one (`.bak`, `.bak.2`, ...).
const KEPT_BACKUPS: u32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot {path} has format {found}, this build reads up to {SNAPSHOT_FORMAT}")]
    UnsupportedFormat { path: PathBuf, found: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "first_format")]
    pub format: u32,
    /// Mutation sequence of `state`
    pub seq: u64,
    pub saved_at: DateTime<Utc>,
    pub state: MetadataState,
}

fn first_format() -> u32 {
    1
}

impl Snapshot {
    pub fn new(state: MetadataState) -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            seq: state.seq,
            saved_at: Utc::now(),
            state,
        }
    }

    /// Replace the file at `path` with this snapshot.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read the snapshot at `path`.
    ///
    /// `Ok(None)` when there is no file, or when the file is unreadable JSON;
    /// in that case it is moved aside to `.bak` so the worker starts empty.
    /// A snapshot from a newer build is an error and is left in place.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Self = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let bak = set_aside(path)?;
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak.display(),
                    "corrupt metadata snapshot moved aside, starting empty",
                );
                return Ok(None);
            }
        };
        if snapshot.format > SNAPSHOT_FORMAT {
            return Err(SnapshotError::UnsupportedFormat {
                path: path.to_path_buf(),
                found: snapshot.format,
            });
        }
        Ok(Some(snapshot))
    }
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    match n {
        1 => path.with_extension("bak"),
        n => path.with_extension(format!("bak.{n}")),
    }
}

/// Move `path` to `.bak`, shifting older backups up and dropping the oldest.
fn set_aside(path: &Path) -> Result<PathBuf, SnapshotError> {
    for n in (1..KEPT_BACKUPS).rev() {
        let from = backup_path(path, n);
        match fs::rename(&from, backup_path(path, n + 1)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    let bak = backup_path(path, 1);
    fs::rename(path, &bak)?;
    Ok(bak)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
