// SPDX-License-Identifier: MIT

//! The invocation event and its canonical event-type enum.
//!
//! There used to be two overlapping event-type enums on the wire (one original, one revised);
//! this crate exposes exactly one. Unrecognized wire values fall into [`EventType::Unknown`]
//! rather than failing to parse, since an invocation that can't classify its own event type
//! must still be able to report [`TerminalEventType::UnknownEventType`] back.

use serde::{Deserialize, Serialize};

use crate::ids::{RequestId, RunId, SyncUnitId};

/// The closed set of invocation event types, plus an `Unknown` catch-all for forward
/// compatibility with event types this build predates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventType {
    #[serde(rename = "EXTRACTION_EXTERNAL_SYNC_UNITS_START")]
    ExtractionExternalSyncUnitsStart,
    #[serde(rename = "EXTRACTION_METADATA_START")]
    ExtractionMetadataStart,
    #[serde(rename = "EXTRACTION_DATA_START")]
    ExtractionDataStart,
    #[serde(rename = "EXTRACTION_DATA_CONTINUE")]
    ExtractionDataContinue,
    #[serde(rename = "EXTRACTION_DATA_DELETE")]
    ExtractionDataDelete,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_START")]
    ExtractionAttachmentsStart,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_CONTINUE")]
    ExtractionAttachmentsContinue,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_DELETE")]
    ExtractionAttachmentsDelete,
    #[serde(rename = "START_LOADING_DATA")]
    StartLoadingData,
    #[serde(rename = "CONTINUE_LOADING_DATA")]
    ContinueLoadingData,
    #[serde(rename = "START_LOADING_ATTACHMENTS")]
    StartLoadingAttachments,
    #[serde(rename = "CONTINUE_LOADING_ATTACHMENTS")]
    ContinueLoadingAttachments,
    #[serde(rename = "START_DELETING_LOADER_STATE")]
    StartDeletingLoaderState,
    #[serde(rename = "START_DELETING_LOADER_ATTACHMENT_STATE")]
    StartDeletingLoaderAttachmentState,
    #[serde(other)]
    Unknown,
}

impl EventType {
    /// Event types that carry no persisted per-sync-unit state: the control plane is never
    /// asked for state before these run, and the worker's state object starts from a fresh
    /// default rather than a fetched document.
    pub fn is_stateless(&self) -> bool {
        matches!(
            self,
            EventType::ExtractionExternalSyncUnitsStart
                | EventType::ExtractionDataDelete
                | EventType::ExtractionAttachmentsDelete
                | EventType::StartDeletingLoaderState
                | EventType::StartDeletingLoaderAttachmentState
        )
    }

    /// The canonical terminal error event the arbiter emits when this event type's invocation
    /// fails fatally or is killed without ever reaching a normal terminal event.
    pub fn canonical_error_event(&self) -> TerminalEventType {
        match self {
            EventType::ExtractionExternalSyncUnitsStart => TerminalEventType::ExternalSyncUnitExtractionError,
            EventType::ExtractionMetadataStart => TerminalEventType::MetadataExtractionError,
            EventType::ExtractionDataStart | EventType::ExtractionDataContinue => {
                TerminalEventType::DataExtractionError
            }
            EventType::ExtractionDataDelete => TerminalEventType::ExtractorStateDeletionError,
            EventType::ExtractionAttachmentsStart | EventType::ExtractionAttachmentsContinue => {
                TerminalEventType::AttachmentExtractionError
            }
            EventType::ExtractionAttachmentsDelete => TerminalEventType::ExtractorAttachmentsStateDeletionError,
            EventType::StartLoadingData | EventType::ContinueLoadingData => TerminalEventType::DataLoadingError,
            EventType::StartLoadingAttachments | EventType::ContinueLoadingAttachments => {
                TerminalEventType::AttachmentLoadingError
            }
            EventType::StartDeletingLoaderState => TerminalEventType::LoaderStateDeletionError,
            EventType::StartDeletingLoaderAttachmentState => TerminalEventType::LoaderAttachmentStateDeletionError,
            EventType::Unknown => TerminalEventType::UnknownEventType,
        }
    }
}

crate::simple_display!(EventType {
    ExtractionExternalSyncUnitsStart => "EXTRACTION_EXTERNAL_SYNC_UNITS_START",
    ExtractionMetadataStart => "EXTRACTION_METADATA_START",
    ExtractionDataStart => "EXTRACTION_DATA_START",
    ExtractionDataContinue => "EXTRACTION_DATA_CONTINUE",
    ExtractionDataDelete => "EXTRACTION_DATA_DELETE",
    ExtractionAttachmentsStart => "EXTRACTION_ATTACHMENTS_START",
    ExtractionAttachmentsContinue => "EXTRACTION_ATTACHMENTS_CONTINUE",
    ExtractionAttachmentsDelete => "EXTRACTION_ATTACHMENTS_DELETE",
    StartLoadingData => "START_LOADING_DATA",
    ContinueLoadingData => "CONTINUE_LOADING_DATA",
    StartLoadingAttachments => "START_LOADING_ATTACHMENTS",
    ContinueLoadingAttachments => "CONTINUE_LOADING_ATTACHMENTS",
    StartDeletingLoaderState => "START_DELETING_LOADER_STATE",
    StartDeletingLoaderAttachmentState => "START_DELETING_LOADER_ATTACHMENT_STATE",
    Unknown => "UNKNOWN",
});

/// The closed set of terminal (callback) event types a worker or the arbiter may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalEventType {
    #[serde(rename = "EXTRACTION_EXTERNAL_SYNC_UNITS_DONE")]
    ExternalSyncUnitsDone,
    #[serde(rename = "EXTRACTION_EXTERNAL_SYNC_UNITS_ERROR")]
    ExternalSyncUnitExtractionError,
    #[serde(rename = "EXTRACTION_METADATA_DONE")]
    MetadataExtractionDone,
    #[serde(rename = "EXTRACTION_METADATA_ERROR")]
    MetadataExtractionError,
    #[serde(rename = "EXTRACTION_DATA_DONE")]
    DataExtractionDone,
    #[serde(rename = "EXTRACTION_DATA_PROGRESS")]
    DataExtractionProgress,
    #[serde(rename = "EXTRACTION_DATA_ERROR")]
    DataExtractionError,
    #[serde(rename = "EXTRACTION_DATA_DELETE_DONE")]
    DataDeleteDone,
    #[serde(rename = "EXTRACTION_DATA_DELETE_ERROR")]
    ExtractorStateDeletionError,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_DONE")]
    AttachmentsExtractionDone,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_PROGRESS")]
    AttachmentsExtractionProgress,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_DELAYED")]
    AttachmentsExtractionDelayed,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_ERROR")]
    AttachmentExtractionError,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_DELETE_DONE")]
    AttachmentsDeleteDone,
    #[serde(rename = "EXTRACTION_ATTACHMENTS_DELETE_ERROR")]
    ExtractorAttachmentsStateDeletionError,
    #[serde(rename = "DATA_LOADING_DONE")]
    DataLoadingDone,
    #[serde(rename = "DATA_LOADING_PROGRESS")]
    DataLoadingProgress,
    #[serde(rename = "DATA_LOADING_ERROR")]
    DataLoadingError,
    #[serde(rename = "ATTACHMENT_LOADING_DONE")]
    AttachmentsLoadingDone,
    #[serde(rename = "ATTACHMENT_LOADING_PROGRESS")]
    AttachmentsLoadingProgress,
    #[serde(rename = "ATTACHMENT_LOADING_DELAYED")]
    AttachmentsLoadingDelayed,
    #[serde(rename = "ATTACHMENT_LOADING_ERROR")]
    AttachmentLoadingError,
    #[serde(rename = "LOADER_STATE_DELETION_DONE")]
    LoaderStateDeletionDone,
    #[serde(rename = "LOADER_STATE_DELETION_ERROR")]
    LoaderStateDeletionError,
    #[serde(rename = "LOADER_ATTACHMENT_STATE_DELETION_DONE")]
    LoaderAttachmentStateDeletionDone,
    #[serde(rename = "LOADER_ATTACHMENT_STATE_DELETION_ERROR")]
    LoaderAttachmentStateDeletionError,
    #[serde(rename = "UNKNOWN_EVENT_TYPE")]
    UnknownEventType,
}

impl TerminalEventType {
    /// Whether this variant represents a successful, non-partial completion (as opposed to a
    /// `Progress`/`Delayed` cooperative early exit or an `Error`).
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            TerminalEventType::ExternalSyncUnitsDone
                | TerminalEventType::MetadataExtractionDone
                | TerminalEventType::DataExtractionDone
                | TerminalEventType::DataDeleteDone
                | TerminalEventType::AttachmentsExtractionDone
                | TerminalEventType::AttachmentsDeleteDone
                | TerminalEventType::DataLoadingDone
                | TerminalEventType::AttachmentsLoadingDone
                | TerminalEventType::LoaderStateDeletionDone
                | TerminalEventType::LoaderAttachmentStateDeletionDone
        )
    }

    pub fn is_error(&self) -> bool {
        !self.is_done()
            && !matches!(
                self,
                TerminalEventType::DataExtractionProgress
                    | TerminalEventType::AttachmentsExtractionProgress
                    | TerminalEventType::AttachmentsExtractionDelayed
                    | TerminalEventType::DataLoadingProgress
                    | TerminalEventType::AttachmentsLoadingProgress
                    | TerminalEventType::AttachmentsLoadingDelayed
            )
    }
}

/// Mode under which the invocation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Initial,
    Incremental,
    Loading,
}

/// Bearer credentials carried by the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secrets {
    pub service_account_token: String,
}

/// Top-level execution context: credentials plus the platform version the invocation targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub secrets: Secrets,
    pub snap_in_version_id: String,
}

/// Per-invocation addressing and scoping information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    pub callback_url: String,
    pub worker_data_url: String,
    pub sync_unit_id: SyncUnitId,
    pub sync_run_id: RunId,
    pub request_id: RequestId,
    pub mode: Mode,
    #[serde(default)]
    pub extract_from: Option<String>,
    #[serde(default)]
    pub initial_sync_scope: Option<String>,
    #[serde(default)]
    pub reset_extract_from: Option<bool>,
    #[serde(default)]
    pub external_system: Option<String>,
    #[serde(default)]
    pub external_system_type: Option<String>,
}

/// Platform endpoints the invocation talks back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub platform_endpoint: String,
    #[serde(default)]
    pub function_name: Option<String>,
}

/// One invocation event, as handed to the supervisor by its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub event_type: EventType,
    pub context: Context,
    pub event_context: EventContext,
    pub execution_metadata: ExecutionMetadata,
    /// Event-type-specific extras (e.g. the external sync units list for a loading event).
    /// Schemas for these payloads are a connector concern, so this crate keeps them opaque.
    #[serde(default)]
    pub input_data: serde_json::Value,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
