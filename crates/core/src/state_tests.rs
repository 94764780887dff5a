// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn default_state_has_never_synced() {
    let state = AdapterState::default();
    assert!(!state.has_synced_before());
}

#[test]
fn connector_fields_round_trip_alongside_sdk_fields() {
    let json = serde_json::json!({
        "last_sync_started": "2026-01-01T00:00:00Z",
        "connector_cursor": "abc123",
        "connector_page_token": 7,
    });
    let state: AdapterState = serde_json::from_value(json).expect("deserializes");
    assert_eq!(state.last_sync_started.as_deref(), Some("2026-01-01T00:00:00Z"));
    assert_eq!(state.connector.get("connector_cursor").and_then(|v| v.as_str()), Some("abc123"));

    let back = serde_json::to_value(&state).expect("serializes");
    assert_eq!(back["connector_page_token"], serde_json::json!(7));
    assert_eq!(back["last_sync_started"], serde_json::json!("2026-01-01T00:00:00Z"));
}

#[test]
fn attachments_metadata_tracks_resume_progress() {
    let mut state = AdapterState::default();
    state.extraction.attachments_metadata.last_processed_attachments_ids_list.push(ProcessedAttachment {
        id: "att-1".into(),
        parent_id: "item-1".into(),
    });
    let json = serde_json::to_string(&state).expect("serializes");
    let back: AdapterState = serde_json::from_str(&json).expect("deserializes");
    assert_eq!(back.extraction.attachments_metadata.last_processed_attachments_ids_list.len(), 1);
}
