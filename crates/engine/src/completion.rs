// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion handler: the single place a job reaches COMPLETED or FAILED.

use crate::error::JobError;
use crate::log_mux::LogMultiplexer;
use crate::manifest::write_manifest;
use crate::registry::{ArtifactRegistry, PublishError};
use crate::sandbox::Sandbox;
use ob_adapters::{log_channel, LogBroadcaster};
use ob_core::{
    parse_metrics, Clock, JobDescriptor, JobId, JobStatus, Metrics, ModelRecord,
    ModelVersionRecord, NewModelVersion, METRICS_FILE,
};
use ob_storage::{MetadataStore, StoreError};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const PUBLISHED_PREFIX: &str = "[SYSTEM] Published";
pub const ERROR_PREFIX: &str = "[SYSTEM ERROR]";

/// Inputs to the success path of one run.
pub struct Success<'a> {
    pub descriptor: &'a JobDescriptor,
    pub sandbox: &'a Sandbox,
    /// Publish target resolved before launch.
    pub target: Option<(&'a ModelRecord, u32)>,
    pub script_sha256: String,
}

pub struct CompletionHandler<S, B, K> {
    store: Arc<S>,
    registry: ArtifactRegistry,
    broadcaster: B,
    clock: K,
    io_timeout: Duration,
}

impl<S, B, K> CompletionHandler<S, B, K>
where
    S: MetadataStore,
    B: LogBroadcaster,
    K: Clock,
{
    pub fn new(
        store: Arc<S>,
        registry: ArtifactRegistry,
        broadcaster: B,
        clock: K,
        io_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            broadcaster,
            clock,
            io_timeout,
        }
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Exit code 0: record evidence, publish if targeted, mark COMPLETED.
    ///
    /// The version record and the COMPLETED transition are committed together.
    /// Any error before that commit leaves the job for [`Self::fail`] with no
    /// version recorded; a version directory this call created is removed
    /// again. Nothing after the commit can fail the job.
    pub async fn succeed(
        &self,
        run: Success<'_>,
        mux: &LogMultiplexer,
    ) -> Result<Option<ModelVersionRecord>, JobError> {
        let job_id = &run.descriptor.job_id;
        let metrics = read_metrics(job_id, &run.sandbox.outputs_dir()).await;

        write_manifest(
            run.sandbox,
            run.descriptor,
            run.script_sha256,
            self.clock.epoch_ms(),
        )
        .await?;

        let Some((model, version)) = run.target else {
            self.store
                .complete_job(job_id, None, self.clock.epoch_ms())
                .await?;
            tracing::info!(job_id = %job_id, published = false, "job completed");
            return Ok(None);
        };

        let artifact = self
            .registry
            .publish(&run.sandbox.outputs_dir(), model, version)
            .await?;
        let new = NewModelVersion {
            model_id: model.id.clone(),
            version,
            path: artifact.path.clone(),
            size_bytes: artifact.size_bytes,
            job_id: job_id.clone(),
            metrics,
        };
        let record = match self
            .store
            .complete_job(job_id, Some(new), self.clock.epoch_ms())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                // The directory is ours: publish only succeeds for the caller that created it.
                if let Err(cleanup) = tokio::fs::remove_dir_all(&artifact.path).await {
                    tracing::warn!(job_id = %job_id, path = %artifact.path.display(), error = %cleanup, "failed to remove unrecorded version directory");
                }
                return Err(match e {
                    StoreError::NotFound { .. } | StoreError::Transition(_) => e.into(),
                    other => PublishError::Record(other).into(),
                });
            }
        };

        tracing::info!(
            job_id = %job_id,
            model_id = %model.id,
            version,
            size_bytes = artifact.size_bytes,
            files = artifact.files,
            "published model version"
        );
        let announcement = format!(
            "{} {} v{} ({} bytes) to {}",
            PUBLISHED_PREFIX,
            model.name,
            version,
            artifact.size_bytes,
            artifact.path.display()
        );
        if let Err(e) = mux.line(&announcement).await {
            tracing::warn!(job_id = %job_id, error = %e, "failed to write publish line");
        }
        tracing::info!(job_id = %job_id, published = true, "job completed");
        Ok(record)
    }

    /// Any failure: mark FAILED and emit one diagnostic line.
    ///
    /// Never returns an error; problems here are logged.
    pub async fn fail(&self, job_id: &JobId, err: &JobError, mux: Option<&LogMultiplexer>) {
        tracing::warn!(
            job_id = %job_id,
            error = %err,
            infrastructure = err.is_infrastructure(),
            "job failed"
        );

        let line = format!("{} {}", ERROR_PREFIX, err);
        match mux {
            Some(mux) => {
                if let Err(e) = mux.line(&line).await {
                    tracing::warn!(job_id = %job_id, error = %e, "failed to write error line");
                }
            }
            None => {
                let channel = log_channel(job_id);
                let message = format!("{}\n", line);
                match tokio::time::timeout(
                    self.io_timeout,
                    self.broadcaster.publish(&channel, &message),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(job_id = %job_id, error = %e, "failed to broadcast error line")
                    }
                    Err(_) => {
                        tracing::warn!(job_id = %job_id, "broadcasting error line timed out")
                    }
                }
            }
        }

        if let Err(e) = self
            .store
            .mark_terminal(
                job_id,
                JobStatus::Failed,
                err.exit_code(),
                self.clock.epoch_ms(),
            )
            .await
        {
            tracing::error!(job_id = %job_id, error = %e, "failed to mark job FAILED");
        }
    }
}

/// Read `metrics.json` from the outputs; anything unusable is an empty map.
pub async fn read_metrics(job_id: &JobId, outputs: &Path) -> Metrics {
    let path = outputs.join(METRICS_FILE);
    match tokio::fs::read(&path).await {
        Ok(bytes) => match parse_metrics(&bytes) {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "ignoring unreadable metrics");
                Metrics::new()
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(job_id = %job_id, "no metrics file reported");
            Metrics::new()
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, path = %path.display(), error = %e, "failed to read metrics");
            Metrics::new()
        }
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
