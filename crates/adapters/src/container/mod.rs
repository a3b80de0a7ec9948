// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Isolated container runtime adapters

mod docker;

pub use docker::{container_config, DockerAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerCall, FakeContainer, FakeContainerAdapter, FakeRun};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Label key marking containers owned by the worker.
pub const MANAGED_BY_LABEL: &str = "managed_by";
pub const MANAGED_BY_VALUE: &str = "oubliette";
pub const JOB_ID_LABEL: &str = "job_id";

/// Errors from container operations
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
    #[error("container create failed: {0}")]
    CreateFailed(String),
    #[error("container start failed: {0}")]
    StartFailed(String),
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("container operation failed: {0}")]
    Runtime(String),
}

/// A host path bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_only(host: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            target: target.into(),
            read_only: true,
        }
    }

    pub fn writable(host: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// Everything needed to create one isolated training container.
///
/// Network access is never granted; there is no field to turn it on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `uid:gid` the process runs as, overriding the image's `USER`.
    pub user: String,
    pub cmd: Vec<String>,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<Mount>,
    pub labels: BTreeMap<String, String>,
}

impl ContainerSpec {
    pub fn writable_mounts(&self) -> impl Iterator<Item = &Mount> {
        self.mounts.iter().filter(|m| !m.read_only)
    }
}

/// Combined stdout+stderr of a running container, in emission order.
pub type OutputStream = BoxStream<'static, Result<Vec<u8>, ContainerError>>;

/// Adapter for an isolated container runtime (Docker, etc.)
#[async_trait]
pub trait ContainerAdapter: Clone + Send + Sync + 'static {
    /// Create a container from `spec`, returning its id. Does not start it.
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError>;

    async fn start(&self, id: &str) -> Result<(), ContainerError>;

    /// Follow the container's combined output until it exits.
    async fn output(&self, id: &str) -> Result<OutputStream, ContainerError>;

    /// Block until the container exits and return its exit code.
    async fn wait(&self, id: &str) -> Result<i64, ContainerError>;

    /// Forcibly terminate a running container.
    async fn kill(&self, id: &str) -> Result<(), ContainerError>;

    /// Remove the container resource (forced).
    async fn remove(&self, id: &str) -> Result<(), ContainerError>;
}
