// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner: drives one job descriptor from QUEUED to a terminal state.
//!
//! Order of work:
//! 1. fetch records, resolve input paths, size-check hyperparameters
//! 2. claim the record (QUEUED -> RUNNING), then create the sandbox and open
//!    the audit log
//! 3. unseal the script into the sandbox
//! 4. launch the container and wait for it
//! 5. destroy the decrypted script
//! 6. hand the exit code to the completion handler
//!
//! Every error from any step ends in [`CompletionHandler::fail`].

use crate::completion::{CompletionHandler, Success};
use crate::error::JobError;
use crate::execution::{ExecutionConfig, ExecutionEngine, ExecutionRequest};
use crate::log_mux::{Console, LogMultiplexer};
use crate::registry::ArtifactRegistry;
use crate::sandbox::{Sandbox, SandboxManager};
use crate::unseal::{sha256_hex, unseal, verify_integrity, UnsealKey};
use ob_adapters::{ContainerAdapter, LogBroadcaster};
use ob_core::{Clock, JobDescriptor, JobStatus, ModelRecord, ScriptRecord};
use ob_storage::{MetadataStore, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const EXIT_LINE_PREFIX: &str = "[SYSTEM] Container exited with code";

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root for input paths and sandboxes
    pub storage_root: PathBuf,
    pub registry_root: PathBuf,
    pub execution: ExecutionConfig,
    pub max_params_bytes: usize,
    /// Bound on each audit-log write and on broadcast draining at close
    pub log_io_timeout: Duration,
    pub console: Console,
}

/// Runner adapter dependencies
pub struct RunnerDeps<S, C, B> {
    pub store: Arc<S>,
    pub containers: C,
    pub broadcaster: B,
    pub key: UnsealKey,
}

/// How a call to [`JobRunner::run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { exit_code: i64 },
    /// The record was not QUEUED (already running or finished); nothing ran
    /// and the sandbox was left alone.
    Skipped(JobStatus),
}

struct Inputs {
    script: ScriptRecord,
    script_blob: PathBuf,
    dataset: PathBuf,
    image: String,
    params_json: String,
    target: Option<(ModelRecord, u32)>,
}

/// Result of trying to move the record to RUNNING.
enum Claim {
    Won(Inputs, Sandbox),
    /// Another delivery got there first.
    Lost(JobStatus),
}

/// Resources that outlive a failed step and need cleanup.
#[derive(Default)]
struct RunState {
    mux: Option<LogMultiplexer>,
    secret: Option<PathBuf>,
}

pub struct JobRunner<S, C, B, K> {
    store: Arc<S>,
    sandboxes: SandboxManager,
    engine: ExecutionEngine<C>,
    completion: CompletionHandler<S, B, K>,
    broadcaster: B,
    key: UnsealKey,
    clock: K,
    max_params_bytes: usize,
    log_io_timeout: Duration,
    console: Console,
}

impl<S, C, B, K> JobRunner<S, C, B, K>
where
    S: MetadataStore,
    C: ContainerAdapter,
    B: LogBroadcaster,
    K: Clock,
{
    pub fn new(deps: RunnerDeps<S, C, B>, clock: K, config: RunnerConfig) -> Self {
        let completion = CompletionHandler::new(
            Arc::clone(&deps.store),
            ArtifactRegistry::new(config.registry_root),
            deps.broadcaster.clone(),
            clock.clone(),
            config.log_io_timeout,
        );
        Self {
            store: deps.store,
            sandboxes: SandboxManager::new(config.storage_root),
            engine: ExecutionEngine::new(deps.containers, config.execution),
            completion,
            broadcaster: deps.broadcaster,
            key: deps.key,
            clock,
            max_params_bytes: config.max_params_bytes,
            log_io_timeout: config.log_io_timeout,
            console: config.console,
        }
    }

    pub fn sandboxes(&self) -> &SandboxManager {
        &self.sandboxes
    }

    /// Run one job to a terminal state. Never returns an error.
    #[tracing::instrument(skip_all, fields(job_id = %descriptor.job_id))]
    pub async fn run(&self, descriptor: &JobDescriptor, cancel: &CancellationToken) -> RunOutcome {
        let job_id = &descriptor.job_id;
        match self.store.job(job_id).await {
            Ok(job) if job.status != JobStatus::Queued => {
                tracing::info!(status = %job.status, "job not queued, ignoring delivery");
                return RunOutcome::Skipped(job.status);
            }
            Ok(_) => {}
            Err(e) => {
                let err = JobError::from(e);
                self.completion.fail(job_id, &err, None).await;
                return RunOutcome::Failed {
                    exit_code: err.exit_code(),
                };
            }
        }

        let started = self.clock.now();
        let mut state = RunState::default();
        let result = match self.claim(descriptor).await {
            Ok(Claim::Won(inputs, sandbox)) => {
                tracing::info!("job started");
                self.execute(descriptor, inputs, sandbox, cancel, &mut state)
                    .await
            }
            Ok(Claim::Lost(status)) => {
                tracing::info!(%status, "job claimed by another delivery");
                return RunOutcome::Skipped(status);
            }
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(()) => RunOutcome::Completed,
            Err(err) => {
                self.completion.fail(job_id, &err, state.mux.as_ref()).await;
                RunOutcome::Failed {
                    exit_code: err.exit_code(),
                }
            }
        };

        if let Some(mux) = state.mux.take() {
            if let Err(e) = mux.close().await {
                tracing::warn!(error = %e, "failed to close audit log");
            }
        }
        let elapsed_ms = self.clock.now().duration_since(started).as_millis() as u64;
        tracing::info!(?outcome, elapsed_ms, "job finished");
        outcome
    }

    /// Check inputs, then take ownership of the record.
    ///
    /// Nothing on disk is touched until the QUEUED -> RUNNING transition has
    /// succeeded, so a duplicate delivery cannot disturb a live sandbox.
    async fn claim(&self, descriptor: &JobDescriptor) -> Result<Claim, JobError> {
        let job_id = &descriptor.job_id;
        let inputs = self.fetch_inputs(descriptor).await?;
        let sandbox = self.sandboxes.sandbox_for(job_id)?;
        match self
            .store
            .mark_running(job_id, &sandbox.audit_log_path(), self.clock.epoch_ms())
            .await
        {
            Ok(()) => Ok(Claim::Won(inputs, sandbox)),
            Err(StoreError::Transition(_)) => {
                let status = self
                    .store
                    .job(job_id)
                    .await
                    .map(|job| job.status)
                    .unwrap_or(JobStatus::Running);
                Ok(Claim::Lost(status))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn execute(
        &self,
        descriptor: &JobDescriptor,
        inputs: Inputs,
        sandbox: Sandbox,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> Result<(), JobError> {
        let job_id = &descriptor.job_id;
        let sandbox = self.sandboxes.prepare(sandbox).await?;
        let mux = LogMultiplexer::open(
            job_id,
            &sandbox.audit_log_path(),
            self.broadcaster.clone(),
            self.console,
            self.log_io_timeout,
        )
        .await?;
        state.mux = Some(mux.clone());

        let contained = self
            .contain(descriptor, &inputs, &sandbox, &mux, cancel, state)
            .await;
        if let Some(secret) = state.secret.take() {
            self.sandboxes.destroy_secret(&secret).await;
        }
        let (exit_code, script_sha256) = contained?;

        mux.line(&format!("{} {}", EXIT_LINE_PREFIX, exit_code))
            .await?;
        if exit_code != 0 {
            return Err(JobError::NonZeroExit { code: exit_code });
        }

        self.completion
            .succeed(
                Success {
                    descriptor,
                    sandbox: &sandbox,
                    target: inputs.target.as_ref().map(|(model, v)| (model, *v)),
                    script_sha256,
                },
                &mux,
            )
            .await?;
        Ok(())
    }

    /// Everything checked before any file is written or container created.
    async fn fetch_inputs(&self, descriptor: &JobDescriptor) -> Result<Inputs, JobError> {
        let script = self.store.script(&descriptor.script_id).await?;
        let dataset = self.store.dataset(&descriptor.dataset_id).await?;
        let runtime = self.store.runtime(&descriptor.runtime_id).await?;

        let target = match descriptor.publish_target() {
            Some((model_id, version)) => Some((self.store.model(model_id).await?, version)),
            None => {
                if descriptor.has_partial_target() {
                    tracing::warn!(
                        target_model_id = ?descriptor.target_model_id,
                        target_version = ?descriptor.target_version,
                        "publish target incomplete, output will not be published"
                    );
                }
                None
            }
        };

        let script_blob = self
            .sandboxes
            .resolve_input_path("script", &script.encrypted_path)
            .await?;
        let dataset = self
            .sandboxes
            .resolve_input_path("dataset", &dataset.path)
            .await?;
        let params_json = descriptor
            .hyperparameters
            .to_payload(self.max_params_bytes)?;

        Ok(Inputs {
            script,
            script_blob,
            dataset,
            image: runtime.image,
            params_json,
            target,
        })
    }

    /// Unseal, launch, wait. Returns the exit code and the script's hash.
    async fn contain(
        &self,
        descriptor: &JobDescriptor,
        inputs: &Inputs,
        sandbox: &Sandbox,
        mux: &LogMultiplexer,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> Result<(i64, String), JobError> {
        let job_id = &descriptor.job_id;
        let blob = tokio::fs::read(&inputs.script_blob).await.map_err(|e| {
            JobError::Io(format!(
                "reading {}: {}",
                inputs.script_blob.display(),
                e
            ))
        })?;
        let plaintext = unseal(&blob, &self.key)?;
        verify_integrity(&plaintext, inputs.script.integrity_hash.as_deref())?;
        let script_sha256 = sha256_hex(&plaintext);

        state.secret = Some(sandbox.script_path());
        let script_path = self.sandboxes.write_secret(sandbox, &plaintext).await?;
        drop(plaintext);

        let request = ExecutionRequest {
            job_id: job_id.clone(),
            image: inputs.image.clone(),
            script_path,
            dataset_path: inputs.dataset.clone(),
            outputs_dir: sandbox.outputs_dir(),
            params_json: inputs.params_json.clone(),
        };
        let running = self.engine.launch(&request, mux).await?;
        if let Err(e) = self.store.attach_container(job_id, running.id()).await {
            tracing::warn!(container_id = running.id(), error = %e, "failed to record container id");
        }
        let exit_code = self.engine.wait(job_id, running, cancel).await?;
        Ok((exit_code, script_sha256))
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
