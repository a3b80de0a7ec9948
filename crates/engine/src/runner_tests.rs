// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{setup, setup_with, TestContext};
use ob_adapters::{ContainerCall, FakeRun};
use ob_core::test_support::{descriptor, publishing_descriptor, script_record};
use ob_core::{Hyperparameters, ModelId};
use serde_json::json;

async fn run(ctx: &TestContext, desc: &JobDescriptor) -> RunOutcome {
    ctx.enqueue(desc).await;
    ctx.runner.run(desc, &CancellationToken::new()).await
}

fn error_lines(ctx: &TestContext, id: &str) -> Vec<String> {
    ctx.broadcaster
        .messages(&format!("logs:{}", id))
        .into_iter()
        .filter(|m| m.starts_with("[SYSTEM ERROR]"))
        .collect()
}

#[tokio::test]
async fn successful_run_completes_and_records_container() {
    let ctx = setup();
    ctx.containers
        .set_default_run(FakeRun::exits(0).with_output("epoch 1\n"));

    let outcome = run(&ctx, &descriptor("job-1")).await;

    assert_eq!(outcome, RunOutcome::Completed);
    let job = ctx.job("job-1").await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.exit_code, Some(0));
    assert_eq!(job.container_id.as_deref(), Some("fake-1"));
    assert_eq!(
        job.log_path,
        Some(ctx.sandbox_dir("job-1").join("audit.log"))
    );
    let audit = std::fs::read_to_string(ctx.sandbox_dir("job-1").join("audit.log")).unwrap();
    assert_eq!(audit, "epoch 1\n[SYSTEM] Container exited with code 0\n");
    assert!(ctx.sandbox_dir("job-1").join("manifest.json").is_file());
}

#[tokio::test]
async fn decrypted_script_exists_only_during_run() {
    let ctx = setup();

    run(&ctx, &descriptor("job-1")).await;

    let container = &ctx.containers.containers()[0];
    assert_eq!(container.mounts_present, vec![true, true, true, true]);
    assert!(!ctx.sandbox_dir("job-1").join("user_model.py").exists());
}

#[tokio::test]
async fn missing_dataset_fails_before_any_container() {
    let ctx = setup();
    std::fs::remove_file(ctx.storage_root.join("datasets/d-1.csv")).unwrap();

    let outcome = run(&ctx, &descriptor("job-1")).await;

    assert_eq!(outcome, RunOutcome::Failed { exit_code: 1 });
    assert_eq!(ctx.job("job-1").await.status, JobStatus::Failed);
    assert!(ctx.containers.calls().is_empty());
    assert_eq!(error_lines(&ctx, "job-1").len(), 1);
    assert!(!ctx.sandbox_dir("job-1").exists());
}

#[tokio::test]
async fn nonzero_exit_records_real_code_and_skips_publish() {
    let ctx = setup();
    ctx.containers.set_default_run(
        FakeRun::exits(3).with_file("metrics.json", br#"{"acc":0.1}"#.to_vec()),
    );

    let outcome = run(&ctx, &publishing_descriptor("job-1", "m-1", 1)).await;

    assert_eq!(outcome, RunOutcome::Failed { exit_code: 3 });
    assert_eq!(ctx.job("job-1").await.exit_code, Some(3));
    assert!(ctx
        .store
        .model_versions(&ModelId::new("m-1"))
        .await
        .unwrap()
        .is_empty());
    let audit = std::fs::read_to_string(ctx.sandbox_dir("job-1").join("audit.log")).unwrap();
    assert!(audit.contains("[SYSTEM] Container exited with code 3\n"));
    assert!(audit.ends_with("[SYSTEM ERROR] training process exited with code 3\n"));
}

#[tokio::test]
async fn wrong_key_is_a_decryption_failure() {
    let ctx = setup();
    let other = UnsealKey::from_bytes([9u8; 32]);
    let blob = crate::unseal::seal(b"print(1)", &other).unwrap();
    std::fs::write(ctx.storage_root.join("scripts/s-1.enc"), blob).unwrap();

    run(&ctx, &descriptor("job-1")).await;

    assert_eq!(ctx.job("job-1").await.status, JobStatus::Failed);
    assert!(ctx.containers.calls().is_empty());
    assert!(error_lines(&ctx, "job-1")[0].contains("decryption failed"));
    assert!(!ctx.sandbox_dir("job-1").join("user_model.py").exists());
}

#[tokio::test]
async fn integrity_mismatch_fails_job() {
    let ctx = setup();
    ctx.store.seed(|s| {
        s.scripts.insert(
            "s-1".to_string(),
            script_record("s-1", "scripts/s-1.enc", Some(&"0".repeat(64))),
        );
    });

    run(&ctx, &descriptor("job-1")).await;

    assert_eq!(ctx.job("job-1").await.status, JobStatus::Failed);
    assert!(ctx.containers.calls().is_empty());
}

#[tokio::test]
async fn oversized_hyperparameters_fail_before_sandbox() {
    let ctx = setup_with(|config| config.max_params_bytes = 16);
    let mut desc = descriptor("job-1");
    let params = json!({ "notes": "far more than sixteen bytes of text" });
    desc.hyperparameters = Hyperparameters::new(params.as_object().unwrap().clone());

    run(&ctx, &desc).await;

    assert_eq!(ctx.job("job-1").await.status, JobStatus::Failed);
    assert!(!ctx.sandbox_dir("job-1").exists());
    assert!(error_lines(&ctx, "job-1")[0].contains("invalid hyperparameters"));
}

#[tokio::test]
async fn terminal_record_is_skipped() {
    let ctx = setup();
    let desc = descriptor("job-1");
    ctx.enqueue(&desc).await;
    ctx.store
        .mark_terminal(&desc.job_id, JobStatus::Failed, 1, 10)
        .await
        .unwrap();

    let outcome = ctx.runner.run(&desc, &CancellationToken::new()).await;

    assert_eq!(outcome, RunOutcome::Skipped(JobStatus::Failed));
    assert!(ctx.containers.calls().is_empty());
}

#[tokio::test]
async fn redelivered_running_job_leaves_live_sandbox_alone() {
    let ctx = setup();
    ctx.containers.set_default_run(FakeRun::hanging());
    let desc = descriptor("job-1");
    ctx.enqueue(&desc).await;
    let cancel = CancellationToken::new();
    let first = tokio::spawn({
        let runner = Arc::clone(&ctx.runner);
        let desc = desc.clone();
        let cancel = cancel.clone();
        async move { runner.run(&desc, &cancel).await }
    });
    let secret = ctx.sandbox_dir("job-1").join("user_model.py");
    for _ in 0..200 {
        if !ctx.containers.containers().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(secret.exists());

    let outcome = ctx.runner.run(&desc, &CancellationToken::new()).await;

    assert_eq!(outcome, RunOutcome::Skipped(JobStatus::Running));
    assert_eq!(ctx.job("job-1").await.status, JobStatus::Running);
    assert!(ctx.sandbox_dir("job-1").join("audit.log").exists());
    assert!(secret.exists());
    assert_eq!(ctx.containers.containers().len(), 1);
    assert!(!first.is_finished());

    cancel.cancel();
    assert_eq!(first.await.unwrap(), RunOutcome::Failed { exit_code: 1 });
}

#[tokio::test]
async fn cancellation_kills_container_and_fails_job() {
    let ctx = setup();
    ctx.containers.set_default_run(FakeRun::hanging());
    let desc = descriptor("job-1");
    ctx.enqueue(&desc).await;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let outcome = ctx.runner.run(&desc, &cancel).await;

    assert_eq!(outcome, RunOutcome::Failed { exit_code: 1 });
    assert!(ctx
        .containers
        .calls()
        .iter()
        .any(|c| matches!(c, ContainerCall::Kill { .. })));
    assert!(error_lines(&ctx, "job-1")[0].contains("job cancelled"));
    assert!(!ctx.sandbox_dir("job-1").join("user_model.py").exists());
}

#[tokio::test]
async fn time_limit_fails_job() {
    let ctx = setup_with(|config| config.execution.max_run = Duration::from_millis(50));
    ctx.containers.set_default_run(FakeRun::hanging());

    let outcome = run(&ctx, &descriptor("job-1")).await;

    assert_eq!(outcome, RunOutcome::Failed { exit_code: 1 });
    assert!(ctx.containers.containers()[0].killed);
}

#[tokio::test]
async fn container_setup_failure_fails_job_and_destroys_secret() {
    let ctx = setup();
    ctx.containers.fail_create("No such image: trainer:1");

    run(&ctx, &descriptor("job-1")).await;

    let job = ctx.job("job-1").await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.container_id.is_none());
    assert!(!ctx.sandbox_dir("job-1").join("user_model.py").exists());
    assert!(error_lines(&ctx, "job-1")[0].contains("No such image"));
}

#[tokio::test]
async fn partial_target_completes_without_publishing() {
    let ctx = setup();
    let mut desc = descriptor("job-1");
    desc.target_model_id = Some(ModelId::new("m-1"));

    let outcome = run(&ctx, &desc).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(ctx.store.state().model_versions.is_empty());
}

#[tokio::test]
async fn unknown_target_model_fails_before_launch() {
    let ctx = setup();

    run(&ctx, &publishing_descriptor("job-1", "m-404", 1)).await;

    assert_eq!(ctx.job("job-1").await.status, JobStatus::Failed);
    assert!(ctx.containers.calls().is_empty());
    assert!(error_lines(&ctx, "job-1")[0].contains("model not found: m-404"));
}
