// SPDX-License-Identifier: MIT

//! Bounded-concurrency attachment streaming pool.
//!
//! Drains a flat list of attachments (drawn from previously uploaded attachment-metadata
//! artifacts) through a fixed number of concurrent workers. A single attachment failure is
//! logged and skipped, never fatal for the phase; a `delay` outcome drains in-flight work and
//! stops pulling new items, leaving the remainder for the next invocation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use tracing::warn;

use sg_core::limits::{ATTACHMENT_POOL_DEFAULT_BATCH_SIZE, MAX_ARTIFACT_SIZE_BYTES};

use crate::uploader::StreamUploadSink;

/// One attachment drawn from a previously uploaded attachment-metadata artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub id: String,
    pub url: String,
    pub file_name: String,
    pub parent_id: String,
    pub author_id: Option<String>,
}

/// What a single attachment transfer did.
#[derive(Debug, Clone)]
pub enum AttachmentOutcome {
    Uploaded,
    Error(String),
    Delay,
}

/// User-supplied attachment transfer: fetch from `record.url`, stream to object storage.
#[async_trait]
pub trait AttachmentStreamer: Send + Sync {
    async fn stream(&self, record: &AttachmentRecord) -> AttachmentOutcome;
}

/// One attachment as scheduled into the pool; surfaced for logging/diagnostics.
#[derive(Debug, Clone)]
pub struct AttachmentTask {
    pub record: AttachmentRecord,
}

/// Terminal result of draining the pool over one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentResult {
    /// Ids to append to `lastProcessedAttachmentsIdsList` for resume-deduplication.
    pub processed_ids: Vec<String>,
    /// Set when a worker returned `delay`; the caller must emit a `…Delayed` terminal event.
    pub delayed: bool,
}

/// Bounded-concurrency pool over a flat attachment list, resumable via already-processed ids.
pub struct AttachmentPool {
    batch_size: usize,
}

impl Default for AttachmentPool {
    fn default() -> Self {
        Self { batch_size: ATTACHMENT_POOL_DEFAULT_BATCH_SIZE }
    }
}

impl AttachmentPool {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1) }
    }

    /// Drives `records` through `streamer`, skipping ids already in `already_processed`.
    ///
    /// `is_timeout` is the cooperative flag shared with the adapter; a worker observes it at
    /// its next rendezvous (before picking up a new record) and stops pulling further work
    /// without treating the remainder as an error.
    pub async fn run(
        &self,
        records: &[AttachmentRecord],
        already_processed: &HashSet<String>,
        is_timeout: Arc<AtomicBool>,
        streamer: Arc<dyn AttachmentStreamer>,
    ) -> AttachmentResult {
        let delay_signaled = Arc::new(AtomicBool::new(false));
        let processed = Arc::new(Mutex::new(Vec::new()));

        let pending: Vec<&AttachmentRecord> =
            records.iter().filter(|r| !already_processed.contains(&r.id)).collect();

        stream::iter(pending)
            .for_each_concurrent(self.batch_size, |record| {
                let delay_signaled = delay_signaled.clone();
                let processed = processed.clone();
                let is_timeout = is_timeout.clone();
                let streamer = streamer.clone();
                async move {
                    if delay_signaled.load(Ordering::SeqCst) || is_timeout.load(Ordering::SeqCst) {
                        return;
                    }
                    match streamer.stream(record).await {
                        AttachmentOutcome::Uploaded => {
                            processed.lock().push(record.id.clone());
                        }
                        AttachmentOutcome::Error(reason) => {
                            warn!(attachment_id = %record.id, error = %reason, "attachment transfer failed, skipping");
                        }
                        AttachmentOutcome::Delay => {
                            delay_signaled.store(true, Ordering::SeqCst);
                        }
                    }
                }
            })
            .await;

        let processed_ids = Arc::try_unwrap(processed).map(Mutex::into_inner).unwrap_or_default();
        AttachmentResult { processed_ids, delayed: delay_signaled.load(Ordering::SeqCst) }
    }
}

/// Default production [`AttachmentStreamer`]: fetches `record.url` and re-streams the response
/// body straight into object storage via a [`StreamUploadSink`], without buffering the whole
/// attachment in memory.
///
/// A connector that needs custom fetch semantics (bespoke auth headers, a non-HTTP transport)
/// supplies its own `AttachmentStreamer` instead; this is the default collaborator for the
/// common case of "download over HTTP, re-upload unmodified".
pub struct HttpAttachmentStreamer<U: StreamUploadSink> {
    http: reqwest::Client,
    uploader: Arc<U>,
}

impl<U: StreamUploadSink> HttpAttachmentStreamer<U> {
    pub fn new(uploader: Arc<U>) -> Self {
        Self { http: reqwest::Client::new(), uploader }
    }
}

#[async_trait]
impl<U: StreamUploadSink> AttachmentStreamer for HttpAttachmentStreamer<U> {
    async fn stream(&self, record: &AttachmentRecord) -> AttachmentOutcome {
        let resp = match self.http.get(&record.url).send().await {
            Ok(r) => r,
            Err(e) => return AttachmentOutcome::Error(e.to_string()),
        };
        if !resp.status().is_success() {
            return AttachmentOutcome::Error(format!("fetch returned status {}", resp.status()));
        }
        let content_length = resp.content_length();
        if content_length.is_some_and(|len| len > MAX_ARTIFACT_SIZE_BYTES) {
            return AttachmentOutcome::Error(format!(
                "attachment exceeds the maximum size of {MAX_ARTIFACT_SIZE_BYTES} bytes"
            ));
        }
        let body = reqwest::Body::wrap_stream(resp.bytes_stream());
        match self.uploader.stream_upload(&record.file_name, body, content_length).await {
            Ok(_artifact) => AttachmentOutcome::Uploaded,
            Err(e) => AttachmentOutcome::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "attachments_tests.rs"]
mod tests;
