// SPDX-License-Identifier: MIT

//! The supervisor's view of the worker: a process it can message, read log/emitted
//! notifications from, and forcibly kill. Abstracted behind a trait so the arbiter/timer logic
//! in [`crate::supervisor`] is unit-testable against a scripted fake instead of a real child
//! process, the same trait-plus-fake shape every other crate in this workspace uses for its
//! external collaborators.

use async_trait::async_trait;

use crate::message::{SupervisorMessage, WorkerMessage};

/// How the worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The process exited on its own (cleanly or by crashing); `code` is its exit code, when
    /// the platform reports one.
    Exited { code: Option<i32> },
    /// The supervisor forcibly terminated the process (the hard timeout fired).
    Killed,
}

#[async_trait]
pub trait WorkerProcess: Send {
    /// Sends one message to the worker over its stdin. Errors here are logged, not fatal: a
    /// worker that can no longer be messaged will still be observed via `recv`/`wait`.
    async fn send(&mut self, message: &SupervisorMessage) -> std::io::Result<()>;

    /// Returns the next message the worker wrote to its stdout, or `None` once stdout has
    /// closed (the worker is exiting or has exited).
    async fn recv(&mut self) -> Option<WorkerMessage>;

    /// Waits for the process to exit and reports its outcome. Called once `recv` returns
    /// `None`.
    async fn wait(&mut self) -> WorkerOutcome;

    /// Forcibly terminates the process (the hard-timeout path).
    async fn kill(&mut self) -> WorkerOutcome;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;

    /// One scripted step in a [`FakeWorkerProcess`]'s timeline.
    pub enum Step {
        /// Emit this message from the worker's stdout after the given delay.
        Message(std::time::Duration, WorkerMessage),
        /// Sleep, simulating a blocked event loop that never yields to read the exit message.
        Sleep(std::time::Duration),
    }

    /// A scripted [`WorkerProcess`] double: plays back a fixed timeline of messages, then
    /// reports `None` (closing stdout) once the script is exhausted, unless `killed` first.
    pub struct FakeWorkerProcess {
        steps: VecDeque<Step>,
        sent: Vec<SupervisorMessage>,
        killed: bool,
        exit_code: Option<i32>,
    }

    impl FakeWorkerProcess {
        pub fn new(steps: Vec<Step>, exit_code: Option<i32>) -> Self {
            Self { steps: steps.into(), sent: Vec::new(), killed: false, exit_code }
        }

        pub fn sent_messages(&self) -> &[SupervisorMessage] {
            &self.sent
        }

        pub fn was_killed(&self) -> bool {
            self.killed
        }
    }

    #[async_trait]
    impl WorkerProcess for FakeWorkerProcess {
        async fn send(&mut self, message: &SupervisorMessage) -> std::io::Result<()> {
            self.sent.push(message.clone());
            Ok(())
        }

        async fn recv(&mut self) -> Option<WorkerMessage> {
            loop {
                if self.killed {
                    return None;
                }
                match self.steps.pop_front() {
                    Some(Step::Message(delay, msg)) => {
                        tokio::time::sleep(delay).await;
                        return Some(msg);
                    }
                    Some(Step::Sleep(delay)) => {
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    None => return None,
                }
            }
        }

        async fn wait(&mut self) -> WorkerOutcome {
            WorkerOutcome::Exited { code: self.exit_code }
        }

        async fn kill(&mut self) -> WorkerOutcome {
            self.killed = true;
            WorkerOutcome::Killed
        }
    }
}
