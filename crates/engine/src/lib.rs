// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Oubliette execution engine: one queued training job to one audited run

pub mod completion;
mod error;
pub mod execution;
pub mod log_mux;
pub mod log_paths;
pub mod manifest;
mod pool;
mod pool_logger;
pub mod registry;
mod runner;
pub mod sandbox;
pub mod unseal;

#[cfg(test)]
mod test_helpers;

pub use completion::CompletionHandler;
pub use error::{JobError, FAILURE_EXIT_CODE};
pub use execution::{ExecutionConfig, ExecutionEngine, ExecutionError, ExecutionRequest};
pub use log_mux::{Console, ConsoleWriter, LogError, LogMultiplexer};
pub use manifest::EvidenceManifest;
pub use pool::{PoolConfig, PoolStats, WorkerPool, DEFAULT_CONCURRENCY};
pub use pool_logger::PoolLogger;
pub use registry::{ArtifactRegistry, PublishError, PublishedArtifact};
pub use runner::{JobRunner, RunOutcome, RunnerConfig, RunnerDeps};
pub use sandbox::{Sandbox, SandboxError, SandboxManager};
pub use unseal::{seal, unseal, UnsealError, UnsealKey};
