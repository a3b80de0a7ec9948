// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Oubliette worker daemon library
//!
//! Configuration, logging and wiring for the `obd` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod env;
pub mod lifecycle;
pub mod logging;
pub mod queue;

pub use config::{Config, ConfigError, FileConfig};
pub use lifecycle::{startup, LifecycleError, WorkerState};
pub use queue::RegisteringQueue;
