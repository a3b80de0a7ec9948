// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: pull descriptors from the queue, run up to N at once.

use crate::pool_logger::PoolLogger;
use crate::runner::{JobRunner, RunOutcome};
use ob_adapters::{ContainerAdapter, JobQueue, LogBroadcaster};
use ob_core::{Clock, JobDescriptor, JobId};
use ob_storage::MetadataStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default concurrency limit.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Pause after a queue error before asking again.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Name used for the pool activity log.
    pub name: String,
    pub concurrency: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Counts over one [`WorkerPool::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct WorkerPool<Q, S, C, B, K> {
    queue: Arc<Q>,
    runner: Arc<JobRunner<S, C, B, K>>,
    config: PoolConfig,
    logger: PoolLogger,
    cancel: CancellationToken,
}

impl<Q, S, C, B, K> WorkerPool<Q, S, C, B, K>
where
    Q: JobQueue,
    S: MetadataStore,
    C: ContainerAdapter,
    B: LogBroadcaster,
    K: Clock,
{
    pub fn new(
        queue: Q,
        runner: Arc<JobRunner<S, C, B, K>>,
        config: PoolConfig,
        logger: PoolLogger,
    ) -> Self {
        Self {
            queue: Arc::new(queue),
            runner,
            config,
            logger,
            cancel: CancellationToken::new(),
        }
    }

    /// Root token. Cancelling it stops dispatch and cancels every running job.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dispatch until the queue closes or the pool is cancelled, then wait for
    /// running jobs to finish.
    pub async fn run(&self) -> PoolStats {
        let limit = self.config.concurrency.max(1);
        let name = self.config.name.as_str();
        let slots = Arc::new(Semaphore::new(limit));
        let mut tasks: JoinSet<(JobId, RunOutcome)> = JoinSet::new();
        let mut stats = PoolStats::default();

        tracing::info!(pool = name, concurrency = limit, "worker pool started");
        self.logger
            .append(name, &format!("started (concurrency={})", limit));

        loop {
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            while let Some(joined) = tasks.try_join_next() {
                self.record(joined, &mut stats, tasks.len(), limit);
            }

            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.queue.next() => next,
            };
            let descriptor = match next {
                Ok(Some(descriptor)) => descriptor,
                Ok(None) => {
                    tracing::info!(pool = name, "queue closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(pool = name, error = %e, "queue read failed");
                    drop(permit);
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(QUEUE_ERROR_BACKOFF) => continue,
                    }
                }
            };

            stats.dispatched += 1;
            tracing::info!(pool = name, job_id = %descriptor.job_id, "dispatching job");
            self.logger.append(
                name,
                &format!(
                    "dispatched {} active={}/{}",
                    descriptor.job_id,
                    tasks.len() + 1,
                    limit
                ),
            );
            tasks.spawn(run_one(
                Arc::clone(&self.runner),
                Arc::clone(&self.queue),
                descriptor,
                self.cancel.child_token(),
                permit,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            self.record(joined, &mut stats, tasks.len(), limit);
        }

        tracing::info!(pool = name, ?stats, "worker pool stopped");
        self.logger.append(
            name,
            &format!(
                "stopped (dispatched={} completed={} failed={} skipped={})",
                stats.dispatched, stats.completed, stats.failed, stats.skipped
            ),
        );
        stats
    }

    fn record(
        &self,
        joined: Result<(JobId, RunOutcome), tokio::task::JoinError>,
        stats: &mut PoolStats,
        active: usize,
        limit: usize,
    ) {
        let name = self.config.name.as_str();
        match joined {
            Ok((job_id, outcome)) => {
                let label = match &outcome {
                    RunOutcome::Completed => {
                        stats.completed += 1;
                        "completed".to_string()
                    }
                    RunOutcome::Failed { exit_code } => {
                        stats.failed += 1;
                        format!("failed (exit {})", exit_code)
                    }
                    RunOutcome::Skipped(status) => {
                        stats.skipped += 1;
                        format!("skipped ({})", status)
                    }
                };
                self.logger.append(
                    name,
                    &format!("{} {} active={}/{}", job_id, label, active, limit),
                );
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(pool = name, error = %e, "job task aborted");
            }
        }
    }
}

async fn run_one<Q, S, C, B, K>(
    runner: Arc<JobRunner<S, C, B, K>>,
    queue: Arc<Q>,
    descriptor: JobDescriptor,
    cancel: CancellationToken,
    permit: tokio::sync::OwnedSemaphorePermit,
) -> (JobId, RunOutcome)
where
    Q: JobQueue,
    S: MetadataStore,
    C: ContainerAdapter,
    B: LogBroadcaster,
    K: Clock,
{
    let outcome = runner.run(&descriptor, &cancel).await;
    if let Err(e) = queue.ack(&descriptor.job_id).await {
        tracing::warn!(job_id = %descriptor.job_id, error = %e, "queue ack failed");
    }
    drop(permit);
    (descriptor.job_id, outcome)
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
