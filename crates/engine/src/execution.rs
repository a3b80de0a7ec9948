// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution engine: launch one constrained training container and wait for it.
//!
//! Constraints applied to every launch:
//! - no network
//! - wrapper, script and dataset mounted read-only
//! - the sandbox outputs directory is the only writable mount
//! - a fixed non-root identity, whatever the image declares
//! - combined stdout+stderr pumped into the job's [`LogMultiplexer`]

use crate::log_mux::{LogError, LogMultiplexer};
use futures_util::StreamExt;
use ob_adapters::{
    ContainerAdapter, ContainerError, ContainerSpec, Mount, OutputStream, JOB_ID_LABEL,
    MANAGED_BY_LABEL, MANAGED_BY_VALUE,
};
use ob_core::JobId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const WRAPPER_MOUNT: &str = "/app/secure_wrapper.py";
pub const SCRIPT_MOUNT: &str = "/app/user_model.py";
pub const DATASET_MOUNT: &str = "/app/data.csv";
pub const OUTPUTS_MOUNT: &str = "/outputs";

/// Environment variable carrying the hyperparameter JSON.
pub const PARAMS_ENV: &str = "HYPERPARAMETERS";

/// How long to keep draining output after the container has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from launching or waiting on a training container
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("refusing to run as privileged identity {0:?}")]
    PrivilegedIdentity(String),
    #[error("container setup failed: {0}")]
    Setup(#[source] ContainerError),
    #[error("waiting for container failed: {0}")]
    Wait(#[source] ContainerError),
    #[error("execution exceeded the {}s time limit", .0.as_secs())]
    TimedOut(Duration),
    #[error("execution cancelled")]
    Cancelled,
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Worker-wide launch settings.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// `uid[:gid]` for the training process.
    pub run_as: String,
    /// Command prefix; the wrapper arguments are appended.
    pub entrypoint: Vec<String>,
    /// Host path of the wrapper script.
    pub wrapper_path: PathBuf,
    pub max_run: Duration,
}

/// One job's launch inputs, all host paths already resolved.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub job_id: JobId,
    pub image: String,
    pub script_path: PathBuf,
    pub dataset_path: PathBuf,
    pub outputs_dir: PathBuf,
    /// Serialized, size-checked hyperparameters.
    pub params_json: String,
}

/// A started container with its output pump.
pub struct RunningContainer {
    id: String,
    pump: JoinHandle<Result<(), LogError>>,
}

impl RunningContainer {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Reject identities that resolve to root.
pub fn validate_run_as(run_as: &str) -> Result<(), ExecutionError> {
    let user = run_as.split(':').next().unwrap_or_default().trim();
    let is_root = user.is_empty()
        || user.eq_ignore_ascii_case("root")
        || user.parse::<u32>().is_ok_and(|uid| uid == 0);
    if is_root {
        Err(ExecutionError::PrivilegedIdentity(run_as.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct ExecutionEngine<C> {
    adapter: C,
    config: ExecutionConfig,
}

impl<C: ContainerAdapter> ExecutionEngine<C> {
    pub fn new(adapter: C, config: ExecutionConfig) -> Self {
        Self { adapter, config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Build the container spec for a request.
    pub fn container_spec(&self, req: &ExecutionRequest) -> ContainerSpec {
        let max_seconds = self.config.max_run.as_secs().to_string();
        let mut cmd = self.config.entrypoint.clone();
        cmd.extend(
            [
                "--script",
                SCRIPT_MOUNT,
                "--dataset",
                DATASET_MOUNT,
                "--save-path",
                OUTPUTS_MOUNT,
                "--params",
                req.params_json.as_str(),
                "--mode",
                "train",
                "--max-seconds",
                max_seconds.as_str(),
            ]
            .map(String::from),
        );

        let labels = BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
            (JOB_ID_LABEL.to_string(), req.job_id.to_string()),
        ]);

        ContainerSpec {
            name: format!("oubliette-{}", req.job_id),
            image: req.image.clone(),
            user: self.config.run_as.clone(),
            cmd,
            env: vec![(PARAMS_ENV.to_string(), req.params_json.clone())],
            mounts: vec![
                Mount::read_only(&self.config.wrapper_path, WRAPPER_MOUNT),
                Mount::read_only(&req.script_path, SCRIPT_MOUNT),
                Mount::read_only(&req.dataset_path, DATASET_MOUNT),
                Mount::writable(&req.outputs_dir, OUTPUTS_MOUNT),
            ],
            labels,
        }
    }

    /// Create and start the container and begin pumping its output into `mux`.
    ///
    /// Any failure here is a setup failure; a container that was created is
    /// removed before returning the error.
    pub async fn launch(
        &self,
        req: &ExecutionRequest,
        mux: &LogMultiplexer,
    ) -> Result<RunningContainer, ExecutionError> {
        validate_run_as(&self.config.run_as)?;
        let spec = self.container_spec(req);

        let id = self
            .adapter
            .create(&spec)
            .await
            .map_err(ExecutionError::Setup)?;

        let attached = match self.adapter.start(&id).await {
            Ok(()) => self.adapter.output(&id).await,
            Err(e) => Err(e),
        };
        let output = match attached {
            Ok(output) => output,
            Err(e) => {
                let _ = self.adapter.kill(&id).await;
                self.remove(&req.job_id, &id).await;
                return Err(ExecutionError::Setup(e));
            }
        };

        tracing::info!(job_id = %req.job_id, container_id = %id, image = %spec.image, "container launched");
        let pump = tokio::spawn(pump_output(output, mux.clone()));
        Ok(RunningContainer { id, pump })
    }

    /// Wait for exit, the time limit, or cancellation, whichever comes first.
    ///
    /// On timeout or cancellation the container is killed. The container is
    /// removed in every case; removal failures are only logged.
    pub async fn wait(
        &self,
        job_id: &JobId,
        running: RunningContainer,
        cancel: &CancellationToken,
    ) -> Result<i64, ExecutionError> {
        let RunningContainer { id, pump } = running;
        let limit = self.config.max_run;

        let outcome = tokio::select! {
            result = self.adapter.wait(&id) => result.map_err(ExecutionError::Wait),
            _ = tokio::time::sleep(limit) => Err(ExecutionError::TimedOut(limit)),
            _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
        };
        if matches!(
            outcome,
            Err(ExecutionError::TimedOut(_) | ExecutionError::Cancelled)
        ) {
            tracing::warn!(job_id = %job_id, container_id = %id, "stopping container");
            if let Err(e) = self.adapter.kill(&id).await {
                tracing::warn!(job_id = %job_id, container_id = %id, error = %e, "kill failed");
            }
        }

        let abort = pump.abort_handle();
        let pumped = match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, pump).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(job_id = %job_id, error = %e, "output pump task failed");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(job_id = %job_id, "output still open after exit, detaching");
                abort.abort();
                Ok(())
            }
        };

        self.remove(job_id, &id).await;

        let exit_code = outcome?;
        pumped?;
        Ok(exit_code)
    }

    async fn remove(&self, job_id: &JobId, id: &str) {
        if let Err(e) = self.adapter.remove(id).await {
            tracing::warn!(job_id = %job_id, container_id = id, error = %e, "container removal failed");
        }
    }
}

/// Feed every chunk to the multiplexer; report the first audit-file failure.
async fn pump_output(mut output: OutputStream, mux: LogMultiplexer) -> Result<(), LogError> {
    let mut first_error = None;
    while let Some(item) = output.next().await {
        match item {
            Ok(chunk) => {
                if let Err(e) = mux.write(&chunk).await {
                    if first_error.is_none() {
                        tracing::error!(path = %mux.audit_path().display(), error = %e, "audit log write failed");
                        first_error = Some(e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "container output stream ended with error");
                break;
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
