// SPDX-License-Identifier: MIT

//! The adapter state document: a small set of SDK-owned fields plus an arbitrary
//! connector-defined substructure that this crate never inspects.

use serde::{Deserialize, Serialize};

use crate::ids::ArtifactId;

/// The full state document round-tripped through the control plane's state store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdapterState {
    #[serde(default)]
    pub last_sync_started: Option<String>,
    #[serde(default)]
    pub last_successful_sync_started: Option<String>,
    #[serde(default)]
    pub snap_in_version_id: Option<String>,
    #[serde(default)]
    pub extraction: ExtractionState,
    #[serde(default)]
    pub loading: LoadingState,
    /// Connector-defined substructure. Round-tripped opaquely; the SDK-owned fields above are
    /// lifted out of this map on deserialize and merged back in on serialize.
    #[serde(flatten)]
    pub connector: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractionState {
    #[serde(default)]
    pub attachments_metadata: AttachmentsMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttachmentsMetadata {
    #[serde(default)]
    pub artifact_ids: Vec<ArtifactId>,
    #[serde(default)]
    pub last_processed: i64,
    #[serde(default)]
    pub last_processed_attachments_ids_list: Vec<ProcessedAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProcessedAttachment {
    pub id: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoadingState {
    #[serde(default)]
    pub files_to_load: Vec<FileToLoad>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileToLoad {
    pub id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AdapterState {
    /// Whether this document has ever completed a sync loop.
    pub fn has_synced_before(&self) -> bool {
        self.last_successful_sync_started.is_some()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
