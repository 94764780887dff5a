// SPDX-License-Identifier: MIT

//! The in-worker API: `push`, `stream_attachments`, the state getter/setter, and `emit`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use sg_adapters::{
    AttachmentRecord, AttachmentStreamer, AttachmentPool, UploadSink, UploadedArtifact,
};
use sg_client::{ControlPlaneClient, TerminalEventPayload};
use sg_core::limits::{truncate_error_message, PENDING_SIZE_BYTES_THRESHOLD};
use sg_core::{AdapterState, Clock, Event, ProcessedAttachment, TerminalEventType};
use sg_storage::StateStore;

use crate::cooperation::{Cooperation, StateAccess};
use crate::error::AdapterError;
use crate::notifier::{LogLevel, SupervisorNotifier};
use crate::repo::{ArtifactSink, Repo, RepoDef};

/// What a call to [`WorkerAdapter::emit`] reports to the platform.
#[derive(Debug, Clone)]
pub enum EmitOutcome {
    Done,
    Progress { percent: Option<u8> },
    Delayed { delay_seconds: u64 },
    Error { message: String },
}

/// Result of draining an attachment batch through [`WorkerAdapter::stream_attachments`].
#[derive(Debug, Clone, Copy)]
pub struct StreamAttachmentsOutcome {
    /// The user's `stream` callback returned `delay` for some attachment; the caller should
    /// treat this invocation as a `…Delayed` phase outcome.
    pub delayed: bool,
}

/// The surface the user-supplied phase task calls against.
///
/// Owns the `AdapterState` exclusively (the parent supervisor never sees its contents), the
/// shared list of uploaded artifacts, and the cooperative timeout signal. Generic over the
/// control-plane client and upload sink so tests can substitute fakes for both.
pub struct WorkerAdapter<C: ControlPlaneClient, U: UploadSink> {
    client: Arc<C>,
    uploader: Arc<U>,
    event: Event,
    clock: Arc<dyn Clock>,
    cooperation: Arc<Cooperation>,
    notifier: Arc<dyn SupervisorNotifier>,
    state: Mutex<AdapterState>,
    repos: AsyncMutex<HashMap<String, Repo<U>>>,
    artifacts: Mutex<Vec<UploadedArtifact>>,
    already_emitted: AtomicBool,
}

impl<C, U> WorkerAdapter<C, U>
where
    C: ControlPlaneClient + 'static,
    U: UploadSink + 'static,
{
    /// `cooperation` is shared with whatever is listening for the supervisor's soft-timeout
    /// message (`sg_daemon::worker::listen_for_supervisor_messages` in the real worker process),
    /// so its `signal_timeout` actually reaches the adapter the phase task calls against.
    pub fn new(
        client: Arc<C>,
        uploader: Arc<U>,
        event: Event,
        initial_state: AdapterState,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn SupervisorNotifier>,
        cooperation: Arc<Cooperation>,
    ) -> Self {
        Self {
            client,
            uploader,
            event,
            clock,
            cooperation,
            notifier,
            state: Mutex::new(initial_state),
            repos: AsyncMutex::new(HashMap::new()),
            artifacts: Mutex::new(Vec::new()),
            already_emitted: AtomicBool::new(false),
        }
    }

    pub fn cooperation(&self) -> Arc<Cooperation> {
        self.cooperation.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn already_emitted(&self) -> bool {
        self.already_emitted.load(Ordering::SeqCst)
    }

    pub fn uploaded_artifacts(&self) -> Vec<UploadedArtifact> {
        self.artifacts.lock().clone()
    }

    /// Read-only state access; always permitted, even once writes are frozen.
    pub fn read_state(&self) -> AdapterState {
        self.state.lock().clone()
    }

    /// Mutate state, unless a timeout has frozen the worker's view. A write attempted after
    /// the persistence window is about to close is dropped and logged, never applied — this is
    /// the read-only state proxy the spec describes, expressed as a guarded write instead of a
    /// wrapper object.
    pub fn write_state(&self, f: impl FnOnce(&mut AdapterState)) {
        if self.cooperation.state_access() == StateAccess::Frozen {
            tracing::warn!("state write dropped: adapter is frozen ahead of an imminent terminal emit");
            return;
        }
        f(&mut self.state.lock());
    }

    /// Creates a [`Repo`] per definition, wired to append successful uploads to the adapter's
    /// shared artifact list and re-check the wire-size budget.
    pub async fn initialize_repos(self: &Arc<Self>, defs: Vec<RepoDef>) {
        let mut repos = self.repos.lock().await;
        for def in defs {
            let item_type = def.item_type.clone();
            let adapter = Arc::clone(self);
            let on_upload: ArtifactSink = Arc::new(move |artifact| adapter.on_upload(artifact));
            repos.insert(item_type, Repo::new(def, Arc::clone(&self.uploader), on_upload));
        }
    }

    fn on_upload(&self, artifact: UploadedArtifact) {
        let mut artifacts = self.artifacts.lock();
        artifacts.push(artifact);
        let pending_bytes = serde_json::to_string(&*artifacts).map(|s| s.len()).unwrap_or(usize::MAX);
        if pending_bytes > PENDING_SIZE_BYTES_THRESHOLD {
            tracing::info!(pending_bytes, "artifact wire-size threshold crossed, signaling cooperative exit");
            self.cooperation.signal_timeout();
        }
    }

    /// Pushes `items` through the repo registered for `item_type`.
    pub async fn push(&self, item_type: &str, items: Vec<serde_json::Value>) -> Result<(), AdapterError> {
        let mut repos = self.repos.lock().await;
        let repo = repos
            .get_mut(item_type)
            .ok_or_else(|| AdapterError::UnknownItemType(item_type.to_string()))?;
        repo.push(items).await.map_err(AdapterError::from)
    }

    /// Flushes every repo's remaining tail batch.
    pub async fn flush_all(&self) -> Result<(), AdapterError> {
        let mut repos = self.repos.lock().await;
        for repo in repos.values_mut() {
            repo.flush().await?;
        }
        Ok(())
    }

    /// Drains `records` through a bounded-concurrency pool, skipping ids already recorded in
    /// `lastProcessedAttachmentsIdsList`, and appends newly processed ids back to state.
    pub async fn stream_attachments(
        &self,
        records: Vec<AttachmentRecord>,
        batch_size: usize,
        streamer: Arc<dyn AttachmentStreamer>,
    ) -> StreamAttachmentsOutcome {
        let already_processed: HashSet<String> = self
            .read_state()
            .extraction
            .attachments_metadata
            .last_processed_attachments_ids_list
            .iter()
            .map(|p| p.id.clone())
            .collect();

        let is_timeout = Arc::new(AtomicBool::new(self.cooperation.is_timeout()));
        let pool = AttachmentPool::new(batch_size);
        let result = pool.run(&records, &already_processed, is_timeout, streamer).await;

        if !result.processed_ids.is_empty() {
            let parent_by_id: HashMap<&str, &str> =
                records.iter().map(|r| (r.id.as_str(), r.parent_id.as_str())).collect();
            self.write_state(|state| {
                for id in &result.processed_ids {
                    let parent_id = parent_by_id.get(id.as_str()).map(|p| (*p).to_string()).unwrap_or_default();
                    state
                        .extraction
                        .attachments_metadata
                        .last_processed_attachments_ids_list
                        .push(ProcessedAttachment { id: id.clone(), parent_id });
                }
            });
        }

        if result.delayed {
            self.cooperation.signal_timeout();
        }

        StreamAttachmentsOutcome { delayed: result.delayed }
    }

    /// Emits the single terminal event for this invocation.
    ///
    /// No-op (logged) if an event was already emitted, or if a `Done` outcome arrives after a
    /// timeout signal — only progress/delayed/error may close out a cooperatively-exited phase.
    pub async fn emit(&self, event_type: TerminalEventType, outcome: EmitOutcome) -> Result<(), AdapterError> {
        if self.already_emitted() {
            tracing::warn!(?event_type, "emit called after a terminal event was already sent, dropping");
            return Ok(());
        }

        if self.cooperation.is_timeout() && event_type.is_done() {
            tracing::warn!(?event_type, "blocked a Done emit after a timeout signal; only progress, delayed, or error may emit now");
            return Ok(());
        }

        if matches!(outcome, EmitOutcome::Done) && !self.event.event_type.is_stateless() {
            self.write_state(|s| {
                if !s.has_synced_before() {
                    tracing::info!("first successful sync completed for this sync unit");
                }
                s.last_successful_sync_started = s.last_sync_started.clone();
            });
        }

        if !self.event.event_type.is_stateless() {
            let state = self.read_state();
            StateStore::new(self.client.as_ref()).save(&self.event, &state).await?;
        }

        let payload = match outcome {
            EmitOutcome::Done => {
                let artifact_ids = self.artifacts.lock().iter().map(|a| a.id.clone()).collect();
                TerminalEventPayload::done(event_type, artifact_ids)
            }
            EmitOutcome::Progress { percent } => {
                let artifact_ids = self.artifacts.lock().iter().map(|a| a.id.clone()).collect();
                TerminalEventPayload::progress(event_type, artifact_ids, percent.unwrap_or(0))
            }
            EmitOutcome::Delayed { delay_seconds } => {
                let artifact_ids = self.artifacts.lock().iter().map(|a| a.id.clone()).collect();
                TerminalEventPayload::delayed(event_type, artifact_ids, delay_seconds)
            }
            EmitOutcome::Error { message } => {
                TerminalEventPayload::error(event_type, truncate_error_message(&message))
            }
        };

        self.client
            .emit(
                &self.event.event_context.callback_url,
                &self.event.context.secrets.service_account_token,
                &payload,
            )
            .await?;

        self.notifier.emitted().await;
        self.already_emitted.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.notifier.log(level, message.into()).await;
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
