// SPDX-License-Identifier: MIT

//! Wire DTOs for control-plane requests and responses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sg_core::TerminalEventType;

#[derive(Debug, Serialize)]
pub(crate) struct GetStateRequest<'a> {
    pub sync_unit_id: &'a str,
    pub request_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetStateResponse {
    pub state: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PutStateRequest<'a> {
    pub sync_unit_id: &'a str,
    pub request_id: &'a str,
    pub state: &'a str,
}

/// The body posted to the invocation's callback URL.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalEventPayload {
    pub event_type: TerminalEventType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifact_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl TerminalEventPayload {
    pub fn done(event_type: TerminalEventType, artifact_ids: Vec<String>) -> Self {
        Self { event_type, artifact_ids, error_message: None, delay_seconds: None, progress: None }
    }

    pub fn error(event_type: TerminalEventType, message: String) -> Self {
        Self { event_type, artifact_ids: Vec::new(), error_message: Some(message), delay_seconds: None, progress: None }
    }

    pub fn progress(event_type: TerminalEventType, artifact_ids: Vec<String>, progress: u8) -> Self {
        Self { event_type, artifact_ids, error_message: None, delay_seconds: None, progress: Some(progress) }
    }

    pub fn delayed(event_type: TerminalEventType, artifact_ids: Vec<String>, delay_seconds: u64) -> Self {
        Self { event_type, artifact_ids, error_message: None, delay_seconds: Some(delay_seconds), progress: None }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ArtifactUploadUrlRequest<'a> {
    pub file_name: &'a str,
    pub file_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A presigned upload target for one artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactUploadDescriptor {
    pub id: String,
    pub upload_url: String,
    #[serde(default)]
    pub form_data: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfirmArtifactUploadRequest<'a> {
    pub artifact_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtifactDownloadUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct InstallInitialDomainMappingRequest<'a> {
    pub snap_in_version_id: &'a str,
    pub mapping: &'a serde_json::Value,
}
