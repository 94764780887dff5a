// SPDX-License-Identifier: MIT

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Spawn a minimal single-connection-per-request HTTP/1.1 server that replies with the
/// response bodies in `responses`, in order, looping the last one if exhausted. Returns the
/// base URL and the number of requests served so far.
async fn spawn_server(responses: Vec<(u16, &'static str, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let (base, count, _requests) = spawn_server_capturing(responses).await;
    (base, count)
}

/// Like [`spawn_server`], but also records the raw bytes of every request received so tests
/// can assert on headers the production client set.
async fn spawn_server_capturing(
    responses: Vec<(u16, &'static str, &'static str)>,
) -> (String, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let requests_clone = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            let idx = count_clone.fetch_add(1, Ordering::SeqCst);
            let (status, extra_headers, body) = responses[idx.min(responses.len() - 1)];
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap_or(0);
            requests_clone.lock().push(String::from_utf8_lossy(&buf[..n]).to_string());
            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                429 => "Too Many Requests",
                500 => "Internal Server Error",
                _ => "Unknown",
            };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\n{extra_headers}\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    (format!("http://{addr}"), count, requests)
}

fn client_for(base_url: String) -> HttpControlPlaneClient {
    HttpControlPlaneClient::new(Endpoints { platform_endpoint: base_url })
}

/// Pulls the value of `header_name` (case-insensitive) out of a raw HTTP/1.1 request's header
/// block, as captured by [`spawn_server_capturing`].
fn header_value<'a>(raw_request: &'a str, header_name: &str) -> Option<&'a str> {
    raw_request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim().eq_ignore_ascii_case(header_name).then(|| value.trim())
    })
}

#[tokio::test]
async fn get_state_returns_none_on_404() {
    let (base, _) = spawn_server(vec![(404, "", "")]).await;
    let client = client_for(base);
    let result = client.get_state("tok", "su-1", "req-1").await.expect("ok");
    assert_eq!(result, None);
}

#[tokio::test]
async fn get_state_returns_body_on_success() {
    let body = r#"{"state":"{\"lastSyncStarted\":\"now\"}"}"#;
    let (base, _) = spawn_server(vec![(200, "", body)]).await;
    let client = client_for(base);
    let result = client.get_state("tok", "su-1", "req-1").await.expect("ok");
    assert!(result.expect("some").contains("lastSyncStarted"));
}

#[tokio::test]
async fn get_state_sends_the_raw_unprefixed_token() {
    let (base, _, requests) = spawn_server_capturing(vec![(200, "", r#"{"state":"{}"}"#)]).await;
    let client = client_for(base);
    client.get_state("raw-token", "su-1", "req-1").await.expect("ok");

    let requests = requests.lock();
    let header = header_value(&requests[0], "Authorization").expect("Authorization header present");
    assert_eq!(header, "raw-token");
}

#[tokio::test]
async fn put_state_sends_the_raw_unprefixed_token() {
    let (base, _, requests) = spawn_server_capturing(vec![(200, "", "{}")]).await;
    let client = client_for(base);
    client.put_state("raw-token", "su-1", "req-1", "{}").await.expect("ok");

    let requests = requests.lock();
    let header = header_value(&requests[0], "Authorization").expect("Authorization header present");
    assert_eq!(header, "raw-token");
}

#[tokio::test]
async fn emit_sends_the_raw_unprefixed_token() {
    let (base, _, requests) = spawn_server_capturing(vec![(200, "", "{}")]).await;
    let client = client_for(base);
    let payload = TerminalEventPayload::done(sg_core::TerminalEventType::DataExtractionDone, vec![]);
    let callback_url = format!("{base}/cb");
    client.emit(&callback_url, "raw-token", &payload).await.expect("ok");

    let requests = requests.lock();
    let header = header_value(&requests[0], "Authorization").expect("Authorization header present");
    assert_eq!(header, "raw-token", "callback endpoint must not receive a Bearer-prefixed token");
}

#[tokio::test]
async fn retries_five_hundreds_before_succeeding() {
    let (base, count) = spawn_server(vec![(500, "", "boom"), (500, "", "boom"), (200, "", "{}")]).await;
    let client = client_for(base);
    let result = client.put_state("tok", "su-1", "req-1", "{}").await;
    assert!(result.is_ok(), "expected eventual success, got {result:?}");
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_three_server_errors() {
    let (base, count) = spawn_server(vec![(500, "", "boom")]).await;
    let client = client_for(base);
    let result = client.put_state("tok", "su-1", "req-1", "{}").await;
    assert!(matches!(result, Err(ClientError::Http { status: 500, .. })));
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn honors_retry_after_on_429_then_succeeds() {
    let (base, count) =
        spawn_server(vec![(429, "Retry-After: 0\r\n", ""), (200, "", "{}")]).await;
    let client = client_for(base);
    let result = client.put_state("tok", "su-1", "req-1", "{}").await;
    assert!(result.is_ok());
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn does_not_retry_other_four_hundreds() {
    let (base, count) = spawn_server(vec![(429, "", "")]).await;
    let client = client_for(base);
    // No Retry-After header: must not retry, and must surface the status.
    let result = client.put_state("tok", "su-1", "req-1", "{}").await;
    assert!(matches!(result, Err(ClientError::Http { status: 429, .. })));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
