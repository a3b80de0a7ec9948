// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::execution::{ExecutionConfig, WRAPPER_MOUNT};
use crate::log_mux::Console;
use crate::runner::{JobRunner, RunnerConfig, RunnerDeps};
use crate::unseal::{seal, sha256_hex, UnsealKey};
use ob_adapters::{FakeBroadcaster, FakeContainerAdapter};
use ob_core::test_support::{dataset_record, model_record, runtime_record, script_record};
use ob_core::{FakeClock, JobDescriptor, JobRecord, DEFAULT_MAX_PARAMS_BYTES};
use ob_storage::{MemoryStore, MetadataStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Convenience alias for the fully-typed test runner.
pub(crate) type TestRunner =
    JobRunner<MemoryStore, FakeContainerAdapter, FakeBroadcaster, FakeClock>;

pub(crate) const KEY: [u8; 32] = [7u8; 32];
pub(crate) const SCRIPT: &[u8] = b"import sys\nprint('training')\n";
pub(crate) const DATASET: &[u8] = b"x,y\n1,2\n";

/// Test context holding the runner, its adapters, and the storage layout.
///
/// Seeds script `s-1`, dataset `d-1`, runtime `r-1` (`trainer:1`) and
/// model `m-1` (`churn`).
pub(crate) struct TestContext {
    pub runner: Arc<TestRunner>,
    pub store: Arc<MemoryStore>,
    pub containers: FakeContainerAdapter,
    pub broadcaster: FakeBroadcaster,
    pub storage_root: PathBuf,
    pub registry_root: PathBuf,
    _dir: TempDir,
}

pub(crate) fn setup() -> TestContext {
    setup_with(|_| {})
}

/// Like [`setup`], with a hook to adjust the runner config.
pub(crate) fn setup_with(adjust: impl FnOnce(&mut RunnerConfig)) -> TestContext {
    let dir = tempdir().unwrap();
    let storage_root = dir.path().join("storage");
    let registry_root = dir.path().join("registry");
    std::fs::create_dir_all(storage_root.join("scripts")).unwrap();
    std::fs::create_dir_all(storage_root.join("datasets")).unwrap();

    let key = UnsealKey::from_bytes(KEY);
    let blob = seal(SCRIPT, &key).unwrap();
    std::fs::write(storage_root.join("scripts/s-1.enc"), blob).unwrap();
    std::fs::write(storage_root.join("datasets/d-1.csv"), DATASET).unwrap();
    let wrapper_path = dir.path().join("secure_wrapper.py");
    std::fs::write(&wrapper_path, b"# wrapper\n").unwrap();

    let store = Arc::new(MemoryStore::new());
    let hash = sha256_hex(SCRIPT);
    store.seed(|s| {
        s.scripts.insert(
            "s-1".to_string(),
            script_record("s-1", "scripts/s-1.enc", Some(&hash)),
        );
        s.datasets
            .insert("d-1".to_string(), dataset_record("d-1", "datasets/d-1.csv"));
        s.runtimes
            .insert("r-1".to_string(), runtime_record("r-1", "trainer:1"));
        s.models
            .insert("m-1".to_string(), model_record("m-1", "churn"));
    });

    let mut config = RunnerConfig {
        storage_root: storage_root.clone(),
        registry_root: registry_root.clone(),
        execution: ExecutionConfig {
            run_as: "65534:65534".to_string(),
            entrypoint: vec!["python".to_string(), WRAPPER_MOUNT.to_string()],
            wrapper_path,
            max_run: Duration::from_secs(60),
        },
        max_params_bytes: DEFAULT_MAX_PARAMS_BYTES,
        log_io_timeout: Duration::from_secs(5),
        console: Console::Silent,
    };
    adjust(&mut config);

    let containers = FakeContainerAdapter::new();
    let broadcaster = FakeBroadcaster::new();
    let runner = Arc::new(JobRunner::new(
        RunnerDeps {
            store: Arc::clone(&store),
            containers: containers.clone(),
            broadcaster: broadcaster.clone(),
            key,
        },
        FakeClock::new(),
        config,
    ));

    TestContext {
        runner,
        store,
        containers,
        broadcaster,
        storage_root,
        registry_root,
        _dir: dir,
    }
}

impl TestContext {
    /// Register the QUEUED record, as the enqueueing side would.
    pub async fn enqueue(&self, descriptor: &JobDescriptor) {
        self.store.register_job(&descriptor.job_id, 0).await.unwrap();
    }

    pub async fn job(&self, id: &str) -> JobRecord {
        self.store.job(&ob_core::JobId::new(id)).await.unwrap()
    }

    pub fn sandbox_dir(&self, id: &str) -> PathBuf {
        self.storage_root.join("sandboxes").join(id)
    }
}
