// SPDX-License-Identifier: MIT

//! An in-memory [`SupervisorNotifier`] double for tests in this crate and `sg-daemon`.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::notifier::{LogLevel, SupervisorNotifier};

#[derive(Debug, Clone)]
pub struct LoggedMessage {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Default)]
pub struct FakeNotifier {
    logs: Mutex<Vec<LoggedMessage>>,
    emitted_count: Mutex<u32>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<LoggedMessage> {
        self.logs.lock().clone()
    }

    pub fn emitted_count(&self) -> u32 {
        *self.emitted_count.lock()
    }
}

#[async_trait]
impl SupervisorNotifier for FakeNotifier {
    async fn log(&self, level: LogLevel, message: String) {
        self.logs.lock().push(LoggedMessage { level, message });
    }

    async fn emitted(&self) {
        *self.emitted_count.lock() += 1;
    }
}
