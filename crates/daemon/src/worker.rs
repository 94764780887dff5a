// SPDX-License-Identifier: MIT

//! The worker side of the supervisor/worker split: the IPC notifier that forwards logs and the
//! `emitted` signal to the parent over stdout, the background task that listens for the
//! parent's `Exit` message on stdin, and [`run_worker`], the orchestration entrypoint shared by
//! the real `--worker` subprocess and in-process tests.
//!
//! The phase logic itself is an external collaborator (spec.md §1 lists it out of scope); this
//! module's job stops at wiring state initialization, the adapter, and the IPC channel around
//! whatever phase future the caller supplies.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;

use sg_adapters::UploadSink;
use sg_client::ControlPlaneClient;
use sg_core::Clock;
use sg_engine::{AdapterError, Cooperation, LogLevel, SupervisorNotifier, WorkerAdapter};
use sg_storage::StateStore;

use crate::error::SupervisorError;
use crate::message::{encode_line, SupervisorMessage, WireLogLevel, WorkerMessage, WorkerStartPayload};

/// Forwards [`SupervisorNotifier`] calls to the parent as newline-delimited JSON on `W`
/// (ordinarily the worker's stdout).
pub struct IpcNotifier<W> {
    sink: AsyncMutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> IpcNotifier<W> {
    pub fn new(sink: W) -> Self {
        Self { sink: AsyncMutex::new(sink) }
    }

    async fn write_line(&self, message: &WorkerMessage) {
        let Ok(line) = encode_line(message) else {
            tracing::error!(?message, "failed to encode worker message, dropping");
            return;
        };
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "failed to write worker message to supervisor");
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SupervisorNotifier for IpcNotifier<W> {
    async fn log(&self, level: LogLevel, message: String) {
        self.write_line(&WorkerMessage::Log { level: WireLogLevel::from(level), message }).await;
    }

    async fn emitted(&self) {
        self.write_line(&WorkerMessage::Emitted).await;
    }
}

/// Reads and decodes the worker's first stdin line, the invocation payload.
pub async fn read_start_payload<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<WorkerStartPayload, SupervisorError> {
    let mut line = String::new();
    reader.read_line(&mut line).await.map_err(|e| SupervisorError::Stdin(e.to_string()))?;
    serde_json::from_str(line.trim_end()).map_err(|e| SupervisorError::Stdin(e.to_string()))
}

/// Spawns a task that reads subsequent stdin lines for a [`SupervisorMessage::Exit`] and signals
/// `cooperation` when it arrives. Returns once stdin closes or a read error occurs.
pub fn listen_for_supervisor_messages<R>(mut reader: R, cooperation: Arc<Cooperation>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => return,
                Ok(_) => {
                    if let Ok(SupervisorMessage::Exit) = serde_json::from_str::<SupervisorMessage>(line.trim_end()) {
                        tracing::info!("soft timeout signaled by supervisor");
                        cooperation.signal_timeout();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "error reading supervisor message, stopping listener");
                    return;
                }
            }
        }
    });
}

/// Runs one invocation: initializes state, builds the [`WorkerAdapter`], and hands it to `phase`
/// (the connector-registered [`PhaseRunner`](crate::registry::PhaseRunner) for this event type).
/// Returns the process exit code: `0` if the phase completed and emitted a terminal event, `1`
/// for any fatal-to-worker outcome (state initialization failure, phase error, or a phase that
/// returned without emitting).
pub async fn run_worker<C, U>(
    client: Arc<C>,
    uploader: Arc<U>,
    payload: WorkerStartPayload,
    notifier: Arc<dyn SupervisorNotifier>,
    clock: Arc<dyn Clock>,
    cooperation: Arc<Cooperation>,
    phase: Arc<dyn crate::registry::PhaseRunner<C, U>>,
) -> i32
where
    C: ControlPlaneClient + 'static,
    U: UploadSink + 'static,
{
    let init = match StateStore::new(client.as_ref())
        .initialize(&payload.event, payload.initial_domain_mapping.as_ref(), clock.as_ref())
        .await
    {
        Ok(init) => init,
        Err(e) => {
            tracing::error!(error = %e, "fatal state initialization failure");
            return 1;
        }
    };

    let adapter = Arc::new(WorkerAdapter::new(
        client,
        uploader,
        payload.event,
        init.state,
        clock,
        notifier,
        cooperation,
    ));

    match phase.run(adapter.clone()).await {
        Ok(()) => {
            if adapter.already_emitted() {
                0
            } else {
                tracing::error!("phase task completed without emitting a terminal event");
                1
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "worker phase task failed");
            1
        }
    }
}
