// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn append_creates_log_file_and_writes_line() {
    let dir = tempfile::tempdir().unwrap();
    let logger = PoolLogger::new(dir.path().to_path_buf());

    logger.append("default", "started (concurrency=2)");

    let log_path = dir.path().join("pool/default.log");
    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("[pool] started (concurrency=2)"));
    assert!(content.ends_with('\n'));
    // YYYY-MM-DDTHH:MM:SSZ
    let ts = content.split(' ').next().unwrap();
    assert_eq!(ts.len(), 20);
    assert!(ts.ends_with('Z'));
}

#[test]
fn append_accumulates_multiple_lines() {
    let dir = tempfile::tempdir().unwrap();
    let logger = PoolLogger::new(dir.path().to_path_buf());

    logger.append("default", "started");
    logger.append("default", "dispatched job-1");
    logger.append("default", "stopped");

    let content = std::fs::read_to_string(logger.path("default")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with("dispatched job-1"));
}

#[test]
fn unwritable_directory_does_not_panic() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"").unwrap();
    let logger = PoolLogger::new(blocker);

    logger.append("default", "started");
}
