// SPDX-License-Identifier: MIT

//! The supervisor's `tokio::select!` orchestration loop: soft timeout (cooperative), hard
//! timeout (non-cooperative kill), an optional memory watcher, and worker message routing, all
//! racing to resolve the invocation through the [`Arbiter`].

use futures_util::future;

use sg_client::ControlPlaneClient;
use sg_core::Event;

use crate::arbiter::Arbiter;
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::message::{SupervisorMessage, WireLogLevel, WorkerMessage};
use crate::process::WorkerProcess;

pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Drives one invocation to completion: routes worker log/emitted messages, signals the
    /// soft timeout at most once, force-kills on the hard timeout or on `memory_exceeded`
    /// firing (when given), then resolves the arbiter exactly once.
    ///
    /// `memory_exceeded` is `None` when memory limits are disabled (see
    /// [`SupervisorConfig::worker_memory_cap_mb`]) so no sampler was started.
    pub async fn supervise<P, C>(
        &self,
        mut process: P,
        client: &C,
        event: &Event,
        memory_exceeded: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<(), SupervisorError>
    where
        P: WorkerProcess,
        C: ControlPlaneClient,
    {
        let arbiter = Arbiter::new();
        let mut already_emitted = false;

        let soft_timeout = tokio::time::sleep(self.config.soft_timeout());
        let hard_timeout = tokio::time::sleep(self.config.hard_timeout());
        tokio::pin!(soft_timeout);
        tokio::pin!(hard_timeout);
        let mut soft_fired = false;

        let mem_watch = async move {
            match memory_exceeded {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(mem_watch);
        let mut mem_fired = false;

        loop {
            tokio::select! {
                biased;

                _ = &mut hard_timeout => {
                    tracing::warn!("hard timeout fired, killing worker process");
                    process.kill().await;
                    break;
                }

                _ = &mut mem_watch, if !mem_fired => {
                    mem_fired = true;
                    tracing::warn!("worker memory cap exceeded, killing worker process");
                    process.kill().await;
                    break;
                }

                _ = &mut soft_timeout, if !soft_fired => {
                    soft_fired = true;
                    tracing::info!("soft timeout fired, asking worker to wrap up");
                    if let Err(e) = process.send(&SupervisorMessage::Exit).await {
                        tracing::warn!(error = %e, "failed to deliver soft-timeout exit message");
                    }
                }

                msg = process.recv() => {
                    match msg {
                        Some(WorkerMessage::Log { level, message }) => log_worker_message(level, &message),
                        Some(WorkerMessage::Emitted) => already_emitted = true,
                        None => {
                            process.wait().await;
                            break;
                        }
                    }
                }
            }
        }

        arbiter.resolve(client, event, already_emitted).await.map_err(SupervisorError::from)
    }
}

fn log_worker_message(level: WireLogLevel, message: &str) {
    match level {
        WireLogLevel::Debug => tracing::debug!(worker = true, "{message}"),
        WireLogLevel::Info => tracing::info!(worker = true, "{message}"),
        WireLogLevel::Warn => tracing::warn!(worker = true, "{message}"),
        WireLogLevel::Error => tracing::error!(worker = true, "{message}"),
    }
}
