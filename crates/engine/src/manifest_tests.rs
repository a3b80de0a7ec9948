// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sandbox::SandboxManager;
use ob_core::test_support::descriptor;
use tempfile::tempdir;

#[tokio::test]
async fn manifest_hashes_audit_log_and_names_inputs() {
    let dir = tempdir().unwrap();
    let manager = SandboxManager::new(dir.path());
    let sandbox = manager.create_sandbox(&JobId::new("job-1")).await.unwrap();
    std::fs::write(sandbox.audit_log_path(), "epoch 1\n").unwrap();

    let (manifest, path) = write_manifest(
        &sandbox,
        &descriptor("job-1"),
        "abc123".to_string(),
        1_767_225_600_000,
    )
    .await
    .unwrap();

    assert_eq!(path, sandbox.manifest_path());
    assert_eq!(manifest.integrity.log_sha256, sha256_hex(b"epoch 1\n"));
    assert_eq!(manifest.integrity.log_file_name, "audit.log");
    assert_eq!(manifest.timestamp.to_rfc3339(), "2026-01-01T00:00:00+00:00");

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["jobId"], "job-1");
    assert_eq!(on_disk["scriptId"], "s-1");
    assert_eq!(on_disk["datasetId"], "d-1");
    assert_eq!(on_disk["status"], "COMPLETED");
    assert_eq!(on_disk["integrity"]["scriptSha256"], "abc123");
}

#[tokio::test]
async fn manifest_stays_out_of_outputs() {
    let dir = tempdir().unwrap();
    let manager = SandboxManager::new(dir.path());
    let sandbox = manager.create_sandbox(&JobId::new("job-2")).await.unwrap();
    std::fs::write(sandbox.audit_log_path(), "").unwrap();

    write_manifest(&sandbox, &descriptor("job-2"), String::new(), 0)
        .await
        .unwrap();

    assert!(!sandbox.outputs_dir().join("manifest.json").exists());
}

#[tokio::test]
async fn missing_audit_log_is_an_error() {
    let dir = tempdir().unwrap();
    let manager = SandboxManager::new(dir.path());
    let sandbox = manager.create_sandbox(&JobId::new("job-3")).await.unwrap();

    let result = write_manifest(&sandbox, &descriptor("job-3"), String::new(), 0).await;

    assert!(matches!(result, Err(SandboxError::Io { .. })));
}
