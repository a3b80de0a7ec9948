// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record() -> JobRecord {
    JobRecord::queued(JobId::new("job-1"), 1_000)
}

#[test]
fn descriptor_parses_queue_wire_format() {
    let json = r#"{
        "jobId": "job-1",
        "targetModelId": "model-9",
        "targetVersion": 3,
        "hyperparameters": {"lr": 0.01, "epochs": 5},
        "scriptId": "s-1",
        "datasetId": "d-1",
        "runtimeId": "r-1"
    }"#;
    let desc: JobDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(desc.job_id, "job-1");
    assert_eq!(desc.script_id, "s-1");
    assert_eq!(desc.hyperparameters.len(), 2);
    let (model, version) = desc.publish_target().unwrap();
    assert_eq!(*model, "model-9");
    assert_eq!(version, 3);
}

#[test]
fn descriptor_without_target_does_not_publish() {
    let json = r#"{"jobId":"j","scriptId":"s","datasetId":"d","runtimeId":"r"}"#;
    let desc: JobDescriptor = serde_json::from_str(json).unwrap();
    assert!(desc.publish_target().is_none());
    assert!(!desc.has_partial_target());
    assert!(desc.hyperparameters.is_empty());
}

#[test]
fn descriptor_with_partial_target() {
    let json = r#"{"jobId":"j","targetModelId":"m","scriptId":"s","datasetId":"d","runtimeId":"r"}"#;
    let desc: JobDescriptor = serde_json::from_str(json).unwrap();
    assert!(desc.publish_target().is_none());
    assert!(desc.has_partial_target());
}

#[yare::parameterized(
    queued_to_running   = { JobStatus::Queued,    JobStatus::Running,   true },
    queued_to_failed    = { JobStatus::Queued,    JobStatus::Failed,    true },
    running_to_complete = { JobStatus::Running,   JobStatus::Completed, true },
    running_to_failed   = { JobStatus::Running,   JobStatus::Failed,    true },
    queued_to_complete  = { JobStatus::Queued,    JobStatus::Completed, false },
    running_to_queued   = { JobStatus::Running,   JobStatus::Queued,    false },
    running_to_running  = { JobStatus::Running,   JobStatus::Running,   false },
    completed_to_failed = { JobStatus::Completed, JobStatus::Failed,    false },
    failed_to_running   = { JobStatus::Failed,    JobStatus::Running,   false },
    failed_to_queued    = { JobStatus::Failed,    JobStatus::Queued,    false },
)]
fn status_edges(from: JobStatus, to: JobStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn status_serializes_uppercase() {
    assert_eq!(
        serde_json::to_string(&JobStatus::Completed).unwrap(),
        "\"COMPLETED\""
    );
    assert_eq!(JobStatus::Failed.to_string(), "FAILED");
}

#[test]
fn start_records_log_path_and_time() {
    let mut rec = record();
    rec.start(PathBuf::from("/s/job-1/audit.log"), 2_000).unwrap();

    assert_eq!(rec.status, JobStatus::Running);
    assert_eq!(rec.started_at_ms, Some(2_000));
    assert_eq!(rec.log_path, Some(PathBuf::from("/s/job-1/audit.log")));
}

#[test]
fn start_twice_is_rejected() {
    let mut rec = record();
    rec.start(PathBuf::from("a.log"), 2_000).unwrap();
    let err = rec.start(PathBuf::from("b.log"), 3_000).unwrap_err();

    assert!(matches!(err, TransitionError::Illegal { .. }));
    assert_eq!(rec.log_path, Some(PathBuf::from("a.log")));
}

#[test]
fn finish_completed_sets_exit_code_and_time() {
    let mut rec = record();
    rec.start(PathBuf::from("a.log"), 2_000).unwrap();
    rec.finish(JobStatus::Completed, 0, 9_000).unwrap();

    assert!(rec.is_terminal());
    assert_eq!(rec.exit_code, Some(0));
    assert_eq!(rec.completed_at_ms, Some(9_000));
}

#[test]
fn queued_job_can_fail_directly() {
    let mut rec = record();
    rec.finish(JobStatus::Failed, 1, 2_000).unwrap();
    assert_eq!(rec.status, JobStatus::Failed);
    assert!(rec.started_at_ms.is_none());
}

#[test]
fn terminal_record_never_reverts() {
    let mut rec = record();
    rec.start(PathBuf::from("a.log"), 2_000).unwrap();
    rec.finish(JobStatus::Failed, 137, 3_000).unwrap();

    assert!(rec.finish(JobStatus::Completed, 0, 4_000).is_err());
    assert!(rec.start(PathBuf::from("b.log"), 4_000).is_err());
    assert_eq!(rec.status, JobStatus::Failed);
    assert_eq!(rec.exit_code, Some(137));
    assert_eq!(rec.completed_at_ms, Some(3_000));
}

#[test]
fn attach_container_requires_running() {
    let mut rec = record();
    assert!(matches!(
        rec.attach_container("c1".into()),
        Err(TransitionError::NotRunning { .. })
    ));

    rec.start(PathBuf::from("a.log"), 2_000).unwrap();
    rec.attach_container("c1".into()).unwrap();
    assert_eq!(rec.container_id.as_deref(), Some("c1"));
}
