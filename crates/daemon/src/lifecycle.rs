// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle: lock, open state, wire adapters into a pool, shut down.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use ob_adapters::{
    ContainerAdapter, ContainerError, DockerAdapter, LocalBroadcastHub, LogBroadcaster,
    QueueError, SpoolQueue, TracedContainer,
};
use ob_core::{Clock, SystemClock};
use ob_engine::execution::ExecutionConfig;
use ob_engine::{
    Console, JobRunner, PoolConfig, PoolLogger, RunnerConfig, RunnerDeps, UnsealError, UnsealKey,
    WorkerPool,
};
use ob_storage::{MemoryStore, StoreError};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::queue::RegisteringQueue;

/// Name of the single pool the worker runs.
pub const POOL_NAME: &str = "default";

/// Queue type the worker pulls from
pub type WorkerQueue<K = SystemClock> = RegisteringQueue<SpoolQueue, MemoryStore, K>;

/// Pool with concrete adapter types (container calls wrapped with tracing)
pub type WorkerDaemonPool = WorkerPool<
    WorkerQueue,
    MemoryStore,
    TracedContainer<DockerAdapter>,
    LocalBroadcastHub,
    SystemClock,
>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: worker already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error("Container runtime unavailable: {0}")]
    Container(#[from] ContainerError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Encryption key rejected: {0}")]
    Key(#[from] UnsealError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker state during operation.
pub struct WorkerState {
    pub pool: WorkerDaemonPool,
    pub store: Arc<MemoryStore>,
    /// When the worker started
    pub start_time: Instant,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: File,
    lock_path: std::path::PathBuf,
}

impl WorkerState {
    /// Release the lock and remove the PID file.
    pub fn shutdown(self) -> Result<(), LifecycleError> {
        drop(self.lock_file);
        if self.lock_path.exists() {
            std::fs::remove_file(&self.lock_path)?;
        }
        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "worker shutdown complete"
        );
        Ok(())
    }
}

/// Start the worker: lock the state dir, open the store, and wire the pool.
pub async fn startup(config: &Config) -> Result<WorkerState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(&config.lock_path)?;

    let store = Arc::new(MemoryStore::open(&config.metadata_path)?);
    let state = store.state();
    info!(
        jobs = state.jobs.len(),
        scripts = state.scripts.len(),
        datasets = state.datasets.len(),
        models = state.models.len(),
        "loaded metadata"
    );

    let containers = TracedContainer::new(DockerAdapter::connect()?);
    let queue = SpoolQueue::open(&config.spool_dir, config.poll)?;
    info!(spool = %queue.dir().display(), "watching spool");

    let pool = assemble(
        config,
        Arc::clone(&store),
        queue,
        containers,
        LocalBroadcastHub::default(),
        SystemClock,
    )?;

    Ok(WorkerState {
        pool,
        store,
        start_time: Instant::now(),
        lock_file,
        lock_path: config.lock_path.clone(),
    })
}

/// Wire a queue and adapters into a ready-to-run pool.
pub fn assemble<C, B, K>(
    config: &Config,
    store: Arc<MemoryStore>,
    queue: SpoolQueue,
    containers: C,
    broadcaster: B,
    clock: K,
) -> Result<WorkerPool<WorkerQueue<K>, MemoryStore, C, B, K>, LifecycleError>
where
    C: ContainerAdapter,
    B: LogBroadcaster,
    K: Clock,
{
    std::fs::create_dir_all(&config.storage_root)?;
    std::fs::create_dir_all(&config.registry_root)?;

    let key = UnsealKey::from_secret(&config.encryption_key)?;
    let runner = JobRunner::new(
        RunnerDeps {
            store: Arc::clone(&store),
            containers,
            broadcaster,
            key,
        },
        clock.clone(),
        RunnerConfig {
            storage_root: config.storage_root.clone(),
            registry_root: config.registry_root.clone(),
            execution: ExecutionConfig {
                run_as: config.run_as.clone(),
                entrypoint: config.entrypoint.clone(),
                wrapper_path: config.wrapper_path.clone(),
                max_run: config.max_run,
            },
            max_params_bytes: config.max_params_bytes,
            log_io_timeout: config.log_io_timeout,
            console: Console::Stdout,
        },
    );

    Ok(WorkerPool::new(
        RegisteringQueue::new(queue, store, clock),
        Arc::new(runner),
        PoolConfig {
            name: POOL_NAME.to_string(),
            concurrency: config.concurrency,
        },
        PoolLogger::new(config.logs_dir.clone()),
    ))
}

/// Take the exclusive worker lock and record our PID in it.
pub fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    // Open without truncating so a running worker's PID survives a failed attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
