// SPDX-License-Identifier: MIT

//! The supervisor: resolves a worker script by event type, spawns the worker as an isolated
//! child process, enforces the two-stage timeout and memory cap, routes log/state messages, and
//! guarantees exactly one terminal event per invocation via the arbiter.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod arbiter;
pub mod config;
pub mod env;
pub mod error;
pub mod message;
pub mod monitor;
pub mod process;
pub mod registry;
pub mod spawn;
pub mod supervisor;
pub mod worker;

pub use arbiter::Arbiter;
pub use config::SupervisorConfig;
pub use error::SupervisorError;
pub use message::{SupervisorMessage, WorkerMessage, WorkerStartPayload};
pub use process::{WorkerOutcome, WorkerProcess};
pub use registry::PhaseRegistry;
pub use spawn::RealWorkerProcess;
pub use supervisor::Supervisor;

#[cfg(any(test, feature = "test-support"))]
pub use process::fake::{FakeWorkerProcess, Step};
