// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue wrapper that records each job as QUEUED before the pool sees it.
//!
//! The enqueueing service normally creates the record; when it has not (or
//! the record store was reset), the worker still needs one to transition.

use std::sync::Arc;

use async_trait::async_trait;
use ob_adapters::{JobQueue, QueueError};
use ob_core::{Clock, JobDescriptor, JobId};
use ob_storage::MetadataStore;

pub struct RegisteringQueue<Q, S, K> {
    inner: Q,
    store: Arc<S>,
    clock: K,
}

impl<Q, S, K> RegisteringQueue<Q, S, K> {
    pub fn new(inner: Q, store: Arc<S>, clock: K) -> Self {
        Self {
            inner,
            store,
            clock,
        }
    }
}

#[async_trait]
impl<Q, S, K> JobQueue for RegisteringQueue<Q, S, K>
where
    Q: JobQueue,
    S: MetadataStore,
    K: Clock,
{
    async fn next(&self) -> Result<Option<JobDescriptor>, QueueError> {
        let Some(descriptor) = self.inner.next().await? else {
            return Ok(None);
        };
        if let Err(e) = self
            .store
            .register_job(&descriptor.job_id, self.clock.epoch_ms())
            .await
        {
            tracing::warn!(job_id = %descriptor.job_id, error = %e, "failed to register job");
        }
        Ok(Some(descriptor))
    }

    async fn ack(&self, job_id: &JobId) -> Result<(), QueueError> {
        self.inner.ack(job_id).await
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
