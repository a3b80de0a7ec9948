// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end job runs against fake containers and an in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod support;

use ob_adapters::FakeRun;
use ob_core::{JobStatus, ModelId};
use ob_engine::RunOutcome;
use ob_storage::MetadataStore;
use support::World;

#[tokio::test]
async fn untargeted_success_completes_without_version() {
    let world = World::new();
    world.containers.set_default_run(FakeRun::exits(0));

    let outcome = world.run(&world.descriptor("job-a")).await;

    assert_eq!(outcome, RunOutcome::Completed);
    let job = world.job("job-a").await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.exit_code, Some(0));
    assert!(job.completed_at_ms.is_some());
    assert!(world.store.state().model_versions.is_empty());
    assert!(world.error_lines("job-a").is_empty());
}

#[tokio::test]
async fn missing_dataset_fails_without_launch() {
    let world = World::new();
    std::fs::remove_file(world.storage_root.join("datasets/D.csv")).unwrap();

    world.run(&world.descriptor("job-b")).await;

    assert_eq!(world.job("job-b").await.status, JobStatus::Failed);
    assert!(world.containers.calls().is_empty());
    assert_eq!(world.error_lines("job-b").len(), 1);
}

#[tokio::test]
async fn targeted_success_publishes_exact_size_and_metrics() {
    let world = World::new();
    let metrics = br#"{"acc":0.9}"#;
    world.containers.set_default_run(
        FakeRun::exits(0)
            .with_file("out.bin", vec![0xAB; 100])
            .with_file("metrics.json", metrics.to_vec()),
    );
    let mut desc = world.descriptor("job-c");
    desc.target_model_id = Some(ModelId::new("M"));
    desc.target_version = Some(3);

    world.run(&desc).await;

    let versions = world.store.model_versions(&ModelId::new("M")).await.unwrap();
    assert_eq!(versions.len(), 1);
    let version = &versions[0];
    assert_eq!(version.version, 3);
    assert_eq!(version.size_bytes, 100 + metrics.len() as u64);
    assert_eq!(version.metrics["acc"], 0.9);
    assert_eq!(version.job_id.as_str(), "job-c");
    assert_eq!(version.path, world.registry_root.join("fraud-model-M/v3"));
    assert_eq!(
        std::fs::read(version.path.join("out.bin")).unwrap().len(),
        100
    );
    assert!(!version.path.join("user_model.py").exists());
    assert!(!version.path.join("audit.log").exists());
}

#[tokio::test]
async fn look_alike_model_names_publish_side_by_side() {
    let world = World::new();
    world.store.seed(|s| {
        s.models.insert(
            "M2".to_string(),
            ob_core::test_support::model_record("M2", "fraud-model"),
        );
    });
    world
        .containers
        .set_default_run(FakeRun::exits(0).with_file("out.bin", vec![1u8; 8]));
    let mut first = world.descriptor("job-1");
    first.target_model_id = Some(ModelId::new("M"));
    first.target_version = Some(1);
    let mut second = world.descriptor("job-2");
    second.target_model_id = Some(ModelId::new("M2"));
    second.target_version = Some(1);

    assert_eq!(world.run(&first).await, RunOutcome::Completed);
    assert_eq!(world.run(&second).await, RunOutcome::Completed);

    assert!(world.registry_root.join("fraud-model-M/v1/out.bin").is_file());
    assert!(world.registry_root.join("fraud-model-M2/v1/out.bin").is_file());
    assert_eq!(world.store.state().model_versions.len(), 2);
}

#[tokio::test]
async fn nonzero_exit_never_publishes() {
    let world = World::new();
    world.containers.set_default_run(
        FakeRun::exits(1).with_file("metrics.json", br#"{"acc":0.5}"#.to_vec()),
    );
    let mut desc = world.descriptor("job-d");
    desc.target_model_id = Some(ModelId::new("M"));
    desc.target_version = Some(1);

    world.run(&desc).await;

    assert_eq!(world.job("job-d").await.status, JobStatus::Failed);
    assert!(world.store.state().model_versions.is_empty());
    assert!(!world.registry_root.join("fraud-model-M/v1").exists());
}

#[tokio::test]
async fn decrypted_script_never_outlives_run() {
    let scripted = [
        FakeRun::exits(0),
        FakeRun::exits(2),
        FakeRun::exits(0).with_output("noise\n"),
    ];
    for (i, run) in scripted.into_iter().enumerate() {
        let world = World::new();
        world.containers.set_default_run(run);
        let id = format!("job-{}", i);
        let script = world.sandbox(&id).join("user_model.py");
        assert!(!script.exists());

        world.run(&world.descriptor(&id)).await;

        assert!(world.job(&id).await.status.is_terminal());
        assert!(!script.exists(), "script left behind for {}", id);
    }
}

#[tokio::test]
async fn concurrent_jobs_keep_separate_sandboxes() {
    let world = World::new();
    world.containers.set_run_for_image(
        "trainer:1",
        FakeRun::exits(0)
            .with_output("from one\n")
            .with_file("one.txt", b"1".to_vec()),
    );
    world.containers.set_run_for_image(
        "trainer:2",
        FakeRun::exits(0)
            .with_output("from two\n")
            .with_file("two.txt", b"2".to_vec()),
    );
    let one = world.descriptor("job-1");
    let mut two = world.descriptor("job-2");
    two.runtime_id = "R2".into();

    let (a, b) = tokio::join!(world.run(&one), world.run(&two));

    assert_eq!(a, RunOutcome::Completed);
    assert_eq!(b, RunOutcome::Completed);
    let log_one = std::fs::read_to_string(world.sandbox("job-1").join("audit.log")).unwrap();
    let log_two = std::fs::read_to_string(world.sandbox("job-2").join("audit.log")).unwrap();
    assert!(log_one.contains("from one") && !log_one.contains("from two"));
    assert!(log_two.contains("from two") && !log_two.contains("from one"));
    assert!(world.sandbox("job-1").join("outputs/one.txt").exists());
    assert!(!world.sandbox("job-1").join("outputs/two.txt").exists());
    assert!(!world.sandbox("job-2").join("outputs/one.txt").exists());
    assert_eq!(
        world.broadcaster.messages("logs:job-1")[0],
        "from one\n".to_string()
    );
}

#[tokio::test]
async fn terminal_record_never_reverts() {
    let world = World::new();
    let desc = world.descriptor("job-e");
    world.run(&desc).await;
    let finished = world.job("job-e").await;

    let again = world.run(&desc).await;

    assert_eq!(again, RunOutcome::Skipped(JobStatus::Completed));
    assert_eq!(world.job("job-e").await, finished);
    assert_eq!(world.containers.containers().len(), 1);
}
