// SPDX-License-Identifier: MIT

//! The worker's link back to the supervisor: log routing and the `WorkerMessageEmitted` signal.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// What the worker adapter sends to the supervisor over the IPC channel.
#[async_trait]
pub trait SupervisorNotifier: Send + Sync {
    async fn log(&self, level: LogLevel, message: String);

    /// Tells the supervisor a terminal event has been emitted, so its arbiter does not
    /// re-emit a canonical error event when this worker exits.
    async fn emitted(&self);
}
