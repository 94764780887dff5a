// SPDX-License-Identifier: MIT

use super::*;
use sg_client::FakeControlPlaneClient;
use sg_core::FakeClock;

fn event(event_type: &str, snap_in_version_id: &str) -> Event {
    let json = serde_json::json!({
        "event_type": event_type,
        "context": { "secrets": { "service_account_token": "tok" }, "snap_in_version_id": snap_in_version_id },
        "event_context": {
            "callback_url": "https://callback.example/cb",
            "worker_data_url": "https://wd.example/wd",
            "sync_unit_id": "su-1",
            "sync_run_id": "run-1",
            "request_id": "req-1",
            "mode": "INITIAL",
        },
        "execution_metadata": { "platform_endpoint": "https://platform.example" },
    });
    serde_json::from_value(json).expect("valid event")
}

#[tokio::test]
async fn stateless_event_never_touches_the_control_plane() {
    let client = FakeControlPlaneClient::new();
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let result = store.initialize(&event("EXTRACTION_DATA_DELETE", "v1"), None, &clock).await.expect("ok");
    assert!(!result.installed_initial_domain_mapping);
    assert_eq!(client.current_state("su-1"), None);
}

#[tokio::test]
async fn missing_state_is_seeded_and_persisted() {
    let client = FakeControlPlaneClient::new();
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let mapping = serde_json::json!({"mapping": true});
    let result = store.initialize(&event("EXTRACTION_METADATA_START", "v1"), Some(&mapping), &clock).await.expect("ok");
    assert!(result.installed_initial_domain_mapping);
    assert!(client.current_state("su-1").is_some());
    assert_eq!(client.installed_mappings(), vec!["v1".to_string()]);
}

#[tokio::test]
async fn version_change_without_mapping_is_fatal() {
    let client = FakeControlPlaneClient::new();
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let result = store.initialize(&event("EXTRACTION_METADATA_START", "v2"), None, &clock).await;
    assert!(matches!(result, Err(FatalError::MissingInitialDomainMapping { version }) if version == "v2"));
}

#[tokio::test]
async fn unchanged_version_skips_mapping_install() {
    let client = FakeControlPlaneClient::new();
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let result = store.initialize(&event("EXTRACTION_METADATA_START", "v1"), None, &clock).await.expect("ok");
    assert!(!result.installed_initial_domain_mapping);
    assert!(client.installed_mappings().is_empty());
}

#[tokio::test]
async fn last_sync_started_is_stamped_only_on_data_start() {
    let client = FakeControlPlaneClient::new();
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let mapping = serde_json::json!({});

    let continue_result =
        store.initialize(&event("EXTRACTION_DATA_CONTINUE", "v1"), Some(&mapping), &clock).await.expect("ok");
    assert!(continue_result.state.last_sync_started.is_none());

    client.put_state("tok", "su-1", "req-1", "{}").await.expect("reset for next call");
    let start_result = store.initialize(&event("EXTRACTION_DATA_START", "v1"), Some(&mapping), &clock).await.expect("ok");
    assert!(start_result.state.last_sync_started.is_some());
}

#[tokio::test]
async fn last_sync_started_is_stamped_once_and_survives_a_second_start_call() {
    let client = FakeControlPlaneClient::new();
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let mapping = serde_json::json!({});

    let first = store.initialize(&event("EXTRACTION_DATA_START", "v1"), Some(&mapping), &clock).await.expect("ok");
    let first_stamp = first.state.last_sync_started.expect("stamped on first call");
    store.save(&event("EXTRACTION_DATA_START", "v1"), &first.state).await.expect("save");

    clock.advance(std::time::Duration::from_secs(1));
    let second = store.initialize(&event("EXTRACTION_DATA_START", "v1"), Some(&mapping), &clock).await.expect("ok");
    assert_eq!(second.state.last_sync_started, Some(first_stamp));
}

#[tokio::test]
async fn malformed_persisted_state_is_a_fatal_parse_error() {
    let client = FakeControlPlaneClient::new();
    client.seed_state("su-1", "not json");
    let store = StateStore::new(&client);
    let clock = FakeClock::new();
    let result = store.initialize(&event("EXTRACTION_METADATA_START", "v1"), None, &clock).await;
    assert!(matches!(result, Err(FatalError::StateParse(_))));
}
