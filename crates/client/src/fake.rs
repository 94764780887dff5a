// SPDX-License-Identifier: MIT

//! An in-memory [`ControlPlaneClient`] double for tests in other crates, avoiding the need to
//! spin up real HTTP servers to exercise state-store/uploader/adapter logic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::dto::{ArtifactUploadDescriptor, TerminalEventPayload};
use crate::error::ClientError;
use crate::http_client::ControlPlaneClient;

/// A single recorded call to `emit`, kept for assertions.
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub callback_url: String,
    pub payload: TerminalEventPayload,
}

#[derive(Default)]
struct Inner {
    states: HashMap<String, String>,
    emitted: Vec<EmittedEvent>,
    installed_mappings: Vec<String>,
    uploaded: Vec<(String, Vec<u8>)>,
}

/// In-memory control-plane double. `emit`/`put_state`/etc. never fail unless primed to via
/// [`FakeControlPlaneClient::fail_next_emit`].
pub struct FakeControlPlaneClient {
    inner: Mutex<Inner>,
    next_artifact_id: AtomicU64,
    fail_next_emit: Mutex<Option<ClientError>>,
    upload_base_url: Mutex<String>,
}

impl Default for FakeControlPlaneClient {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_artifact_id: AtomicU64::new(1),
            fail_next_emit: Mutex::new(None),
            upload_base_url: Mutex::new("fake://upload".to_string()),
        }
    }
}

impl FakeControlPlaneClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_state(&self, sync_unit_id: &str, raw_state: &str) {
        self.inner.lock().states.insert(sync_unit_id.to_string(), raw_state.to_string());
    }

    pub fn emitted(&self) -> Vec<EmittedEvent> {
        self.inner.lock().emitted.clone()
    }

    pub fn installed_mappings(&self) -> Vec<String> {
        self.inner.lock().installed_mappings.clone()
    }

    pub fn current_state(&self, sync_unit_id: &str) -> Option<String> {
        self.inner.lock().states.get(sync_unit_id).cloned()
    }

    pub fn fail_next_emit(&self, err: ClientError) {
        *self.fail_next_emit.lock() = Some(err);
    }

    /// Point presigned upload descriptors at a real server, for tests that exercise an actual
    /// HTTP upload flow against this fake's control-plane responses.
    pub fn set_upload_base_url(&self, base_url: impl Into<String>) {
        *self.upload_base_url.lock() = base_url.into();
    }
}

#[async_trait]
impl ControlPlaneClient for FakeControlPlaneClient {
    async fn get_state(&self, _token: &str, sync_unit_id: &str, _request_id: &str) -> Result<Option<String>, ClientError> {
        Ok(self.inner.lock().states.get(sync_unit_id).cloned())
    }

    async fn put_state(&self, _token: &str, sync_unit_id: &str, _request_id: &str, raw_state: &str) -> Result<(), ClientError> {
        self.inner.lock().states.insert(sync_unit_id.to_string(), raw_state.to_string());
        Ok(())
    }

    async fn emit(&self, callback_url: &str, _token: &str, payload: &TerminalEventPayload) -> Result<(), ClientError> {
        if let Some(err) = self.fail_next_emit.lock().take() {
            return Err(err);
        }
        self.inner.lock().emitted.push(EmittedEvent { callback_url: callback_url.to_string(), payload: payload.clone() });
        Ok(())
    }

    async fn get_artifact_upload_url(
        &self,
        _token: &str,
        file_name: &str,
        _file_type: &str,
        _file_size: Option<u64>,
    ) -> Result<ArtifactUploadDescriptor, ClientError> {
        let id = self.next_artifact_id.fetch_add(1, Ordering::SeqCst);
        let base = self.upload_base_url.lock().clone();
        Ok(ArtifactUploadDescriptor {
            id: format!("artifact-{id}"),
            upload_url: format!("{base}/{file_name}"),
            form_data: HashMap::new(),
        })
    }

    async fn confirm_artifact_upload(&self, _token: &str, artifact_id: &str) -> Result<(), ClientError> {
        self.inner.lock().uploaded.push((artifact_id.to_string(), Vec::new()));
        Ok(())
    }

    async fn get_artifact_download_url(&self, _token: &str, artifact_id: &str) -> Result<String, ClientError> {
        Ok(format!("fake://download/{artifact_id}"))
    }

    async fn install_initial_domain_mapping(
        &self,
        _token: &str,
        snap_in_version_id: &str,
        _mapping: &serde_json::Value,
    ) -> Result<(), ClientError> {
        self.inner.lock().installed_mappings.push(snap_in_version_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
