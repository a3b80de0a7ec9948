// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker container adapter

use super::{ContainerAdapter, ContainerError, ContainerSpec, OutputStream};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;

/// Container adapter backed by a local Docker daemon.
#[derive(Clone)]
pub struct DockerAdapter {
    docker: Docker,
}

impl DockerAdapter {
    /// Connect using the platform defaults (`DOCKER_HOST` or the local socket).
    pub fn connect() -> Result<Self, ContainerError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ContainerError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Translate a spec into the Docker create body.
///
/// Networking is disabled twice over (`network_disabled` and network mode
/// `none`); every capability is dropped and privilege escalation is refused.
pub fn container_config(spec: &ContainerSpec) -> Config<String> {
    let binds = spec
        .mounts
        .iter()
        .map(|m| {
            let mode = if m.read_only { "ro" } else { "rw" };
            format!("{}:{}:{}", m.host.display(), m.target, mode)
        })
        .collect();

    let env = spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
    let labels: HashMap<String, String> = spec
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.cmd.clone()),
        env: Some(env),
        user: Some(spec.user.clone()),
        labels: Some(labels),
        network_disabled: Some(true),
        tty: Some(false),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        host_config: Some(HostConfig {
            binds: Some(binds),
            network_mode: Some("none".to_string()),
            auto_remove: Some(false),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn runtime_error(id: &str, e: DockerError) -> ContainerError {
    match e {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => ContainerError::NotFound(id.to_string()),
        other => ContainerError::Runtime(other.to_string()),
    }
}

#[async_trait]
impl ContainerAdapter for DockerAdapter {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| ContainerError::CreateFailed(e.to_string()))?;
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| ContainerError::StartFailed(e.to_string()))
    }

    async fn output(&self, id: &str) -> Result<OutputStream, ContainerError> {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        let owned_id = id.to_string();
        let stream = self.docker.logs(id, Some(options)).map(move |item| match item {
            Ok(
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message },
            ) => Ok(message.to_vec()),
            Ok(LogOutput::StdIn { .. }) => Ok(Vec::new()),
            Err(e) => Err(runtime_error(&owned_id, e)),
        });
        Ok(stream.boxed())
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.docker.wait_container(id, Some(options));
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Nonzero exits arrive as an error carrying the code.
            Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(runtime_error(id, e)),
            None => {
                let inspect = self
                    .docker
                    .inspect_container(id, None)
                    .await
                    .map_err(|e| runtime_error(id, e))?;
                inspect
                    .state
                    .and_then(|s| s.exit_code)
                    .ok_or_else(|| ContainerError::Runtime(format!("no exit code for {id}")))
            }
        }
    }

    async fn kill(&self, id: &str) -> Result<(), ContainerError> {
        self.docker
            .kill_container(id, None::<KillContainerOptions<String>>)
            .await
            .map_err(|e| runtime_error(id, e))
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| runtime_error(id, e))
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
