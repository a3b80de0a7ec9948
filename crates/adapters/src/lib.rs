// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the worker's external collaborators

pub mod broadcast;
pub mod container;
pub mod queue;
pub mod traced;

pub use broadcast::{log_channel, BroadcastError, LocalBroadcastHub, LogBroadcaster, NoOpBroadcaster};
pub use container::{
    ContainerAdapter, ContainerError, ContainerSpec, DockerAdapter, Mount, OutputStream,
    JOB_ID_LABEL, MANAGED_BY_LABEL, MANAGED_BY_VALUE,
};
pub use queue::{ChannelQueue, ChannelQueueSender, JobQueue, QueueError, SpoolQueue};
pub use traced::TracedContainer;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use broadcast::{BroadcastCall, FakeBroadcaster};
#[cfg(any(test, feature = "test-support"))]
pub use container::{ContainerCall, FakeContainer, FakeContainerAdapter, FakeRun};
