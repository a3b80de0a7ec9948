// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::container::Mount;
use std::collections::BTreeMap;

fn spec() -> ContainerSpec {
    ContainerSpec {
        name: "oubliette-job-1".to_string(),
        image: "ml-train:latest".to_string(),
        user: "65534:65534".to_string(),
        cmd: vec!["python".to_string(), "/app/secure_wrapper.py".to_string()],
        env: vec![("HYPERPARAMETERS".to_string(), r#"{"lr":0.1}"#.to_string())],
        mounts: vec![
            Mount::read_only("/srv/sandbox/job-1/user_model.py", "/app/user_model.py"),
            Mount::writable("/srv/sandbox/job-1/outputs", "/outputs"),
        ],
        labels: BTreeMap::from([
            ("job_id".to_string(), "job-1".to_string()),
            ("managed_by".to_string(), "oubliette".to_string()),
        ]),
    }
}

#[test]
fn config_disables_networking() {
    let config = container_config(&spec());
    let host = config.host_config.unwrap();

    assert_eq!(config.network_disabled, Some(true));
    assert_eq!(host.network_mode.as_deref(), Some("none"));
}

#[test]
fn config_binds_carry_mount_modes() {
    let host = container_config(&spec()).host_config.unwrap();

    assert_eq!(
        host.binds.unwrap(),
        vec![
            "/srv/sandbox/job-1/user_model.py:/app/user_model.py:ro".to_string(),
            "/srv/sandbox/job-1/outputs:/outputs:rw".to_string(),
        ]
    );
}

#[test]
fn config_overrides_image_user() {
    let config = container_config(&spec());
    assert_eq!(config.user.as_deref(), Some("65534:65534"));
}

#[test]
fn config_drops_capabilities() {
    let host = container_config(&spec()).host_config.unwrap();
    assert_eq!(host.cap_drop, Some(vec!["ALL".to_string()]));
    assert_eq!(
        host.security_opt,
        Some(vec!["no-new-privileges".to_string()])
    );
}

#[test]
fn config_carries_env_and_labels() {
    let config = container_config(&spec());

    assert_eq!(
        config.env.unwrap(),
        vec![r#"HYPERPARAMETERS={"lr":0.1}"#.to_string()]
    );
    let labels = config.labels.unwrap();
    assert_eq!(labels.get("managed_by").map(String::as_str), Some("oubliette"));
    assert_eq!(labels.get("job_id").map(String::as_str), Some("job-1"));
}
