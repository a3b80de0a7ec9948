// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::container::{ContainerAdapter, ContainerError, ContainerSpec, OutputStream};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any ContainerAdapter
#[derive(Clone)]
pub struct TracedContainer<C> {
    inner: C,
}

impl<C> TracedContainer<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ContainerAdapter> ContainerAdapter for TracedContainer<C> {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        async {
            tracing::info!(
                image = %spec.image,
                user = %spec.user,
                mounts = spec.mounts.len(),
                "creating"
            );
            let start = std::time::Instant::now();
            let result = self.inner.create(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(id) => tracing::info!(container_id = id.as_str(), elapsed_ms, "container created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(tracing::info_span!("container.create", name = %spec.name))
        .await
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        let start = std::time::Instant::now();
        let result = self.inner.start(id).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info_span!("container.start", container_id = id).in_scope(|| match &result {
            Ok(()) => tracing::info!(elapsed_ms, "started"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "start failed"),
        });
        result
    }

    async fn output(&self, id: &str) -> Result<OutputStream, ContainerError> {
        let result = self.inner.output(id).await;
        if let Err(ref e) = result {
            tracing::error!(container_id = id, error = %e, "attach failed");
        }
        result
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.wait(id).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(exit_code) => tracing::info!(exit_code, elapsed_ms, "exited"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "wait failed"),
            }
            result
        }
        .instrument(tracing::info_span!("container.wait", container_id = id))
        .await
    }

    async fn kill(&self, id: &str) -> Result<(), ContainerError> {
        let result = self.inner.kill(id).await;
        tracing::info_span!("container.kill", container_id = id).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        let result = self.inner.remove(id).await;
        match &result {
            Ok(()) => tracing::debug!(container_id = id, "removed"),
            Err(e) => tracing::warn!(container_id = id, error = %e, "remove failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
