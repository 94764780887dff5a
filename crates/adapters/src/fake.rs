// SPDX-License-Identifier: MIT

//! An in-memory [`UploadSink`] double for tests in other crates.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::UploadError;
use crate::uploader::{StreamUploadSink, UploadSink, UploadedArtifact};

/// One recorded call to `upload_batch`, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub item_type: String,
    pub records: Vec<serde_json::Value>,
}

#[derive(Default)]
struct Inner {
    uploads: Vec<RecordedUpload>,
    streamed: Vec<String>,
    next_id: u64,
    fail_next: Option<UploadError>,
}

/// In-memory [`UploadSink`]; never touches the network. `upload_batch` succeeds unless primed
/// to fail via [`FakeUploadSink::fail_next_upload`].
#[derive(Default)]
pub struct FakeUploadSink {
    inner: Mutex<Inner>,
}

impl FakeUploadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.inner.lock().uploads.clone()
    }

    pub fn fail_next_upload(&self, err: UploadError) {
        self.inner.lock().fail_next = Some(err);
    }

    pub fn streamed(&self) -> Vec<String> {
        self.inner.lock().streamed.clone()
    }
}

#[async_trait]
impl UploadSink for FakeUploadSink {
    async fn upload_batch(
        &self,
        item_type: &str,
        records: &[serde_json::Value],
    ) -> Result<UploadedArtifact, UploadError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }
        inner.next_id += 1;
        let id = format!("fake-artifact-{}", inner.next_id);
        inner.uploads.push(RecordedUpload { item_type: item_type.to_string(), records: records.to_vec() });
        Ok(UploadedArtifact { id, item_type: item_type.to_string(), item_count: records.len() })
    }
}

#[async_trait]
impl StreamUploadSink for FakeUploadSink {
    async fn stream_upload(
        &self,
        item_type: &str,
        body: reqwest::Body,
        _content_length: Option<u64>,
    ) -> Result<UploadedArtifact, UploadError> {
        drop(body);
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }
        inner.next_id += 1;
        let id = format!("fake-stream-{}", inner.next_id);
        inner.streamed.push(item_type.to_string());
        Ok(UploadedArtifact { id, item_type: item_type.to_string(), item_count: 1 })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
