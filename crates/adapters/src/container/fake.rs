// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake container adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ContainerAdapter, ContainerError, ContainerSpec, OutputStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Exit code reported by a container ended with `kill`.
pub const KILLED_EXIT_CODE: i64 = 137;

/// Recorded container call
#[derive(Debug, Clone)]
pub enum ContainerCall {
    Create { spec: ContainerSpec },
    Start { id: String },
    Output { id: String },
    Wait { id: String },
    Kill { id: String },
    Remove { id: String },
}

/// Scripted behavior for a fake container.
#[derive(Debug, Clone, Default)]
pub struct FakeRun {
    pub chunks: Vec<Vec<u8>>,
    pub exit_code: i64,
    /// Files written into the writable mount when the container starts.
    pub files: Vec<(String, Vec<u8>)>,
    /// Never exits on its own; only `kill` ends it.
    pub hang: bool,
}

impl FakeRun {
    pub fn exits(exit_code: i64) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, chunk: impl Into<Vec<u8>>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((name.into(), contents.into()));
        self
    }
}

/// Fake container state
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub spec: ContainerSpec,
    pub run: FakeRun,
    /// Whether each mount's host path existed at create time, in mount order.
    pub mounts_present: Vec<bool>,
    pub started: bool,
    pub killed: bool,
    pub removed: bool,
}

#[derive(Default)]
struct FakeContainerState {
    containers: HashMap<String, FakeContainer>,
    calls: Vec<ContainerCall>,
    default_run: FakeRun,
    runs_by_image: HashMap<String, FakeRun>,
    create_error: Option<String>,
    start_error: Option<String>,
    remove_error: Option<String>,
    next_id: u64,
}

/// Fake container adapter for testing
#[derive(Clone, Default)]
pub struct FakeContainerAdapter {
    inner: Arc<Mutex<FakeContainerState>>,
}

impl FakeContainerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behavior for containers whose image has no specific run configured.
    pub fn set_default_run(&self, run: FakeRun) {
        self.inner.lock().default_run = run;
    }

    pub fn set_run_for_image(&self, image: &str, run: FakeRun) {
        self.inner.lock().runs_by_image.insert(image.to_string(), run);
    }

    pub fn fail_create(&self, message: &str) {
        self.inner.lock().create_error = Some(message.to_string());
    }

    pub fn fail_start(&self, message: &str) {
        self.inner.lock().start_error = Some(message.to_string());
    }

    pub fn fail_remove(&self, message: &str) {
        self.inner.lock().remove_error = Some(message.to_string());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ContainerCall> {
        self.inner.lock().calls.clone()
    }

    /// All containers ever created, in creation order.
    pub fn containers(&self) -> Vec<FakeContainer> {
        let inner = self.inner.lock();
        let mut containers: Vec<_> = inner.containers.values().cloned().collect();
        containers.sort_by_key(|c| {
            c.id.trim_start_matches("fake-")
                .parse::<u64>()
                .unwrap_or(u64::MAX)
        });
        containers
    }

    pub fn get_container(&self, id: &str) -> Option<FakeContainer> {
        self.inner.lock().containers.get(id).cloned()
    }

    fn record(&self, call: ContainerCall) {
        self.inner.lock().calls.push(call);
    }

    fn with_container<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut FakeContainer) -> T,
    ) -> Result<T, ContainerError> {
        let mut inner = self.inner.lock();
        inner
            .containers
            .get_mut(id)
            .map(f)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl ContainerAdapter for FakeContainerAdapter {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        self.record(ContainerCall::Create { spec: spec.clone() });
        let mut inner = self.inner.lock();
        if let Some(message) = &inner.create_error {
            return Err(ContainerError::CreateFailed(message.clone()));
        }
        let run = inner
            .runs_by_image
            .get(&spec.image)
            .cloned()
            .unwrap_or_else(|| inner.default_run.clone());
        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);
        let container = FakeContainer {
            id: id.clone(),
            spec: spec.clone(),
            run,
            mounts_present: spec.mounts.iter().map(|m| m.host.exists()).collect(),
            started: false,
            killed: false,
            removed: false,
        };
        inner.containers.insert(id.clone(), container);
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::Start { id: id.to_string() });
        if let Some(message) = self.inner.lock().start_error.clone() {
            return Err(ContainerError::StartFailed(message));
        }
        let container = self.with_container(id, |c| {
            c.started = true;
            c.clone()
        })?;
        if let Some(outputs) = container.spec.writable_mounts().next() {
            for (name, contents) in &container.run.files {
                std::fs::write(outputs.host.join(name), contents)
                    .map_err(|e| ContainerError::Runtime(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn output(&self, id: &str) -> Result<OutputStream, ContainerError> {
        self.record(ContainerCall::Output { id: id.to_string() });
        let chunks = self.with_container(id, |c| c.run.chunks.clone())?;
        Ok(futures_util::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        self.record(ContainerCall::Wait { id: id.to_string() });
        let (started, run) = self.with_container(id, |c| (c.started, c.run.clone()))?;
        if !started {
            return Err(ContainerError::Runtime(format!("{id} is not running")));
        }
        if !run.hang {
            return Ok(run.exit_code);
        }
        loop {
            if self.with_container(id, |c| c.killed)? {
                return Ok(KILLED_EXIT_CODE);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn kill(&self, id: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::Kill { id: id.to_string() });
        self.with_container(id, |c| c.killed = true)
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::Remove { id: id.to_string() });
        if let Some(message) = self.inner.lock().remove_error.clone() {
            return Err(ContainerError::Runtime(message));
        }
        self.with_container(id, |c| c.removed = true)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
