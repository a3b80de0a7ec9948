// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spool-directory queue.
//!
//! Producers drop `<job_id>.json` descriptors into the spool directory. A
//! worker claims one by renaming it into `claimed/`; the rename is atomic, so
//! two workers sharing a spool never claim the same file. Unparseable files
//! are moved to `rejected/`.

use super::{JobQueue, QueueError};
use async_trait::async_trait;
use ob_core::{JobDescriptor, JobId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

pub struct SpoolQueue {
    dir: PathBuf,
    claimed_dir: PathBuf,
    rejected_dir: PathBuf,
    poll: Duration,
    claimed: Mutex<HashMap<JobId, PathBuf>>,
}

impl SpoolQueue {
    /// Open (creating if needed) a spool rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, poll: Duration) -> Result<Self, QueueError> {
        let dir = dir.into();
        let claimed_dir = dir.join("claimed");
        let rejected_dir = dir.join("rejected");
        fs::create_dir_all(&claimed_dir)?;
        fs::create_dir_all(&rejected_dir)?;
        Ok(Self {
            dir,
            claimed_dir,
            rejected_dir,
            poll,
            claimed: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a descriptor into the spool (write-then-rename).
    pub fn enqueue(&self, descriptor: &JobDescriptor) -> Result<PathBuf, QueueError> {
        let json = serde_json::to_vec_pretty(descriptor).map_err(|e| QueueError::Malformed {
            path: descriptor.job_id.to_string(),
            message: e.to_string(),
        })?;
        let tmp = self.dir.join(format!(".{}.tmp", descriptor.job_id));
        let path = self.dir.join(format!("{}.json", descriptor.job_id));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Pending descriptor files, oldest first.
    fn pending(&self) -> Result<Vec<PathBuf>, QueueError> {
        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_descriptor = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if !is_descriptor || !entry.file_type()?.is_file() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// Claim the oldest parseable descriptor, if any.
    fn try_claim(&self) -> Result<Option<JobDescriptor>, QueueError> {
        for path in self.pending()? {
            let Some(name) = path.file_name() else {
                continue;
            };
            let claimed_path = self.claimed_dir.join(name);
            match fs::rename(&path, &claimed_path) {
                Ok(()) => {}
                // Claimed by another worker between listing and rename.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }

            let parsed = fs::read(&claimed_path)
                .map_err(QueueError::from)
                .and_then(|bytes| {
                    serde_json::from_slice::<JobDescriptor>(&bytes).map_err(|e| {
                        QueueError::Malformed {
                            path: claimed_path.display().to_string(),
                            message: e.to_string(),
                        }
                    })
                });
            match parsed {
                Ok(descriptor) => {
                    debug!(job_id = %descriptor.job_id, path = %claimed_path.display(), "claimed");
                    self.claimed
                        .lock()
                        .insert(descriptor.job_id.clone(), claimed_path);
                    return Ok(Some(descriptor));
                }
                Err(e) => {
                    let rejected = self.rejected_dir.join(name);
                    warn!(error = %e, rejected = %rejected.display(), "rejecting descriptor");
                    fs::rename(&claimed_path, &rejected)?;
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl JobQueue for SpoolQueue {
    async fn next(&self) -> Result<Option<JobDescriptor>, QueueError> {
        loop {
            if let Some(descriptor) = self.try_claim()? {
                return Ok(Some(descriptor));
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn ack(&self, job_id: &JobId) -> Result<(), QueueError> {
        let Some(path) = self.claimed.lock().remove(job_id) else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
