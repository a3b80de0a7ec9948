// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A worker wired to fakes over a temporary storage root.

#![allow(dead_code)]

use ob_adapters::{FakeBroadcaster, FakeContainerAdapter};
use ob_core::test_support::{dataset_record, model_record, runtime_record, script_record};
use ob_core::{FakeClock, JobDescriptor, JobId, JobRecord, DEFAULT_MAX_PARAMS_BYTES};
use ob_engine::execution::WRAPPER_MOUNT;
use ob_engine::unseal::sha256_hex;
use ob_engine::{
    seal, Console, ExecutionConfig, JobRunner, RunOutcome, RunnerConfig, RunnerDeps, UnsealKey,
};
use ob_storage::{MemoryStore, MetadataStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub type Runner = JobRunner<MemoryStore, FakeContainerAdapter, FakeBroadcaster, FakeClock>;

pub const SCRIPT: &[u8] = b"print('fit')\n";

pub struct World {
    pub runner: Arc<Runner>,
    pub store: Arc<MemoryStore>,
    pub containers: FakeContainerAdapter,
    pub broadcaster: FakeBroadcaster,
    pub storage_root: PathBuf,
    pub registry_root: PathBuf,
    _dir: TempDir,
}

impl World {
    /// Script `S`, dataset `D`, runtimes `R` (`trainer:1`) and `R2`
    /// (`trainer:2`), model `M` named "Fraud Model".
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage_root = dir.path().join("storage");
        let registry_root = dir.path().join("registry");
        std::fs::create_dir_all(storage_root.join("scripts")).unwrap();
        std::fs::create_dir_all(storage_root.join("datasets")).unwrap();

        let key = UnsealKey::from_bytes([3u8; 32]);
        std::fs::write(
            storage_root.join("scripts/S.enc"),
            seal(SCRIPT, &key).unwrap(),
        )
        .unwrap();
        std::fs::write(storage_root.join("datasets/D.csv"), b"a,b\n1,0\n").unwrap();
        let wrapper_path = dir.path().join("secure_wrapper.py");
        std::fs::write(&wrapper_path, b"").unwrap();

        let store = Arc::new(MemoryStore::new());
        let hash = sha256_hex(SCRIPT);
        store.seed(|s| {
            s.scripts.insert(
                "S".to_string(),
                script_record("S", "scripts/S.enc", Some(&hash)),
            );
            s.datasets
                .insert("D".to_string(), dataset_record("D", "datasets/D.csv"));
            s.runtimes
                .insert("R".to_string(), runtime_record("R", "trainer:1"));
            s.runtimes
                .insert("R2".to_string(), runtime_record("R2", "trainer:2"));
            s.models
                .insert("M".to_string(), model_record("M", "Fraud Model"));
        });

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
            RunnerConfig {
                storage_root: storage_root.clone(),
                registry_root: registry_root.clone(),
                execution: ExecutionConfig {
                    run_as: "65534:65534".to_string(),
                    entrypoint: vec!["python".to_string(), WRAPPER_MOUNT.to_string()],
                    wrapper_path,
                    max_run: Duration::from_secs(30),
                },
                max_params_bytes: DEFAULT_MAX_PARAMS_BYTES,
                log_io_timeout: Duration::from_secs(5),
                console: Console::Silent,
            },
        ));

        Self {
            runner,
            store,
            containers,
            broadcaster,
            storage_root,
            registry_root,
            _dir: dir,
        }
    }

    /// Descriptor in the `S`/`D`/`R` shape with no publish target.
    pub fn descriptor(&self, job_id: &str) -> JobDescriptor {
        JobDescriptor {
            script_id: "S".into(),
            dataset_id: "D".into(),
            runtime_id: "R".into(),
            ..ob_core::test_support::descriptor(job_id)
        }
    }

    pub async fn run(&self, descriptor: &JobDescriptor) -> RunOutcome {
        self.store
            .register_job(&descriptor.job_id, 0)
            .await
            .unwrap();
        self.runner.run(descriptor, &CancellationToken::new()).await
    }

    pub async fn job(&self, id: &str) -> JobRecord {
        self.store.job(&JobId::new(id)).await.unwrap()
    }

    pub fn sandbox(&self, id: &str) -> PathBuf {
        self.storage_root.join("sandboxes").join(id)
    }

    pub fn error_lines(&self, id: &str) -> Vec<String> {
        self.broadcaster
            .messages(&format!("logs:{}", id))
            .into_iter()
            .filter(|m| m.starts_with("[SYSTEM ERROR]"))
            .collect()
    }
}
