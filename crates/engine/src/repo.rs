// SPDX-License-Identifier: MIT

//! Per-item-type accumulator: normalize, batch at [`ARTIFACT_BATCH_SIZE`], upload, and surface
//! the resulting artifact to a caller-supplied sink.

use std::sync::Arc;

use sg_adapters::{UploadError, UploadSink, UploadedArtifact};
use sg_core::limits::ARTIFACT_BATCH_SIZE;

/// Reserved item types that bypass connector-defined normalization.
const RESERVED_ITEM_TYPES: &[&str] = &["external_domain_metadata", "attachments", "ssor_attachment"];

/// A connector-defined transform applied to each pushed item before batching.
pub type NormalizeFn = Arc<dyn Fn(&serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Invoked once per flushed batch, so the owner (the worker adapter) can append the artifact
/// to its shared list and re-evaluate the wire-size budget. The repo never reads this list back.
pub type ArtifactSink = Arc<dyn Fn(UploadedArtifact) + Send + Sync>;

/// Declares one repository: its item type and optional normalizer.
pub struct RepoDef {
    pub item_type: String,
    pub normalize: Option<NormalizeFn>,
}

impl RepoDef {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self { item_type: item_type.into(), normalize: None }
    }

    pub fn with_normalize(mut self, normalize: NormalizeFn) -> Self {
        self.normalize = Some(normalize);
        self
    }
}

/// Per-item-type buffer. Flushes automatically once pending items cross
/// [`ARTIFACT_BATCH_SIZE`]; the caller must call [`Repo::flush`] for the remainder.
pub struct Repo<U: UploadSink> {
    item_type: String,
    normalize: Option<NormalizeFn>,
    pending: Vec<serde_json::Value>,
    uploader: Arc<U>,
    on_upload: ArtifactSink,
}

impl<U: UploadSink> Repo<U> {
    pub fn new(def: RepoDef, uploader: Arc<U>, on_upload: ArtifactSink) -> Self {
        Self { item_type: def.item_type, normalize: def.normalize, pending: Vec::new(), uploader, on_upload }
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn bypasses_normalization(&self) -> bool {
        RESERVED_ITEM_TYPES.contains(&self.item_type.as_str())
    }

    /// Normalizes and appends `items`, flushing a batch of exactly [`ARTIFACT_BATCH_SIZE`] each
    /// time pending items reach that threshold. On upload failure the batch that failed to
    /// upload remains in `pending` for the caller to retry.
    pub async fn push(&mut self, items: Vec<serde_json::Value>) -> Result<(), UploadError> {
        let bypass = self.bypasses_normalization();
        for item in items {
            let normalized = match (&self.normalize, bypass) {
                (Some(f), false) => f(&item),
                _ => item,
            };
            self.pending.push(normalized);
        }

        while self.pending.len() >= ARTIFACT_BATCH_SIZE {
            let batch = &self.pending[..ARTIFACT_BATCH_SIZE];
            let artifact = self.uploader.upload_batch(&self.item_type, batch).await?;
            self.pending.drain(..ARTIFACT_BATCH_SIZE);
            (self.on_upload)(artifact);
        }
        Ok(())
    }

    /// Uploads whatever remains below the batch threshold. No-op if pending is empty.
    pub async fn flush(&mut self) -> Result<(), UploadError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let artifact = self.uploader.upload_batch(&self.item_type, &self.pending).await?;
        self.pending.clear();
        (self.on_upload)(artifact);
        Ok(())
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
