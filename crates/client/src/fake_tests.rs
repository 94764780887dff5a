// SPDX-License-Identifier: MIT

use super::*;
use sg_core::TerminalEventType;

#[tokio::test]
async fn seeded_state_is_fetchable() {
    let fake = FakeControlPlaneClient::new();
    fake.seed_state("su-1", "{\"a\":1}");
    let state = fake.get_state("tok", "su-1", "req-1").await.expect("ok");
    assert_eq!(state.as_deref(), Some("{\"a\":1}"));
}

#[tokio::test]
async fn put_state_overwrites() {
    let fake = FakeControlPlaneClient::new();
    fake.put_state("tok", "su-1", "req-1", "{\"a\":1}").await.expect("ok");
    fake.put_state("tok", "su-1", "req-1", "{\"a\":2}").await.expect("ok");
    assert_eq!(fake.current_state("su-1").as_deref(), Some("{\"a\":2}"));
}

#[tokio::test]
async fn emit_records_the_payload() {
    let fake = FakeControlPlaneClient::new();
    let payload = TerminalEventPayload::done(TerminalEventType::DataExtractionDone, vec!["a1".into()]);
    fake.emit("https://cb.example", "token", &payload).await.expect("ok");
    let emitted = fake.emitted();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].callback_url, "https://cb.example");
}

#[tokio::test]
async fn primed_failure_surfaces_once() {
    let fake = FakeControlPlaneClient::new();
    fake.fail_next_emit(ClientError::Network("down".into()));
    let payload = TerminalEventPayload::done(TerminalEventType::DataExtractionDone, vec![]);
    assert!(fake.emit("https://cb.example", "t", &payload).await.is_err());
    assert!(fake.emit("https://cb.example", "t", &payload).await.is_ok());
}
