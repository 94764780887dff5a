// SPDX-License-Identifier: MIT

//! End-to-end scenario tests driven entirely through fakes and an in-process worker harness:
//! no real HTTP server, no real child process. Each scenario pins a specific race in the
//! supervisor/worker split (cooperative exit, a hard kill, a memory kill, the wire-size budget,
//! and the control plane's 429 backoff).

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sg_adapters::FakeUploadSink;
use sg_client::{ControlPlaneClient, Endpoints, FakeControlPlaneClient, HttpControlPlaneClient};
use sg_core::{
    AdapterState, Clock, Context, Event, EventContext, EventType, ExecutionMetadata, FakeClock,
    Mode, Secrets, TerminalEventType,
};
use sg_daemon::message::{encode_line, SupervisorMessage, WorkerMessage, WorkerStartPayload};
use sg_daemon::process::{WorkerOutcome, WorkerProcess};
use sg_daemon::registry::PhaseRunner;
use sg_daemon::worker::{listen_for_supervisor_messages, read_start_payload, run_worker, IpcNotifier};
use sg_daemon::{Arbiter, Supervisor, SupervisorConfig};
use sg_engine::{AdapterError, Cooperation, EmitOutcome, SupervisorNotifier, WorkerAdapter};

fn event(event_type: EventType) -> Event {
    Event {
        event_type,
        context: Context { secrets: Secrets { service_account_token: "tok".to_string() }, snap_in_version_id: "v1".to_string() },
        event_context: EventContext {
            callback_url: "https://callback.example/cb".to_string(),
            worker_data_url: "https://wd.example/wd".to_string(),
            sync_unit_id: "su-1".into(),
            sync_run_id: "run-1".into(),
            request_id: "req-1".into(),
            mode: Mode::Initial,
            extract_from: None,
            initial_sync_scope: None,
            reset_extract_from: None,
            external_system: None,
            external_system_type: None,
        },
        execution_metadata: ExecutionMetadata { platform_endpoint: "https://platform.example".to_string(), function_name: None },
        input_data: serde_json::Value::Null,
    }
}

/// A [`WorkerProcess`] backed by an in-memory duplex pipe instead of a real child process,
/// driving the real `run_worker` entrypoint in a spawned task. Mirrors
/// `sg_daemon::spawn::RealWorkerProcess`'s shape (stdin/stdout halves plus a way to reap the
/// process), but "waiting" joins the task and "killing" aborts it.
struct InProcessWorkerProcess {
    stdin: WriteHalf<tokio::io::DuplexStream>,
    stdout: BufReader<ReadHalf<tokio::io::DuplexStream>>,
    handle: Option<JoinHandle<i32>>,
}

impl InProcessWorkerProcess {
    fn spawn<P>(client: Arc<FakeControlPlaneClient>, clock: Arc<dyn Clock>, phase: Arc<P>) -> Self
    where
        P: PhaseRunner<FakeControlPlaneClient, FakeUploadSink> + 'static,
    {
        let (supervisor_side, worker_side) = tokio::io::duplex(64 * 1024);
        let (sup_read, sup_write) = tokio::io::split(supervisor_side);
        let (work_read, work_write) = tokio::io::split(worker_side);

        let handle = tokio::spawn(async move {
            let mut work_read = BufReader::new(work_read);
            let payload = match read_start_payload(&mut work_read).await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "in-process worker failed to read its start payload");
                    return 1;
                }
            };

            let cooperation = Arc::new(Cooperation::new());
            listen_for_supervisor_messages(work_read, cooperation.clone());

            let uploader = Arc::new(FakeUploadSink::new());
            let notifier: Arc<dyn SupervisorNotifier> = Arc::new(IpcNotifier::new(work_write));
            run_worker(client, uploader, payload, notifier, clock, cooperation, phase).await
        });

        Self { stdin: sup_write, stdout: BufReader::new(sup_read), handle: Some(handle) }
    }

    async fn send_start_payload(&mut self, payload: &WorkerStartPayload) -> std::io::Result<()> {
        let line = encode_line(payload).unwrap_or_default();
        self.stdin.write_all(line.as_bytes()).await
    }
}

#[async_trait]
impl WorkerProcess for InProcessWorkerProcess {
    async fn send(&mut self, message: &SupervisorMessage) -> std::io::Result<()> {
        let line = encode_line(message).unwrap_or_default();
        self.stdin.write_all(line.as_bytes()).await
    }

    async fn recv(&mut self) -> Option<WorkerMessage> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.stdout.read_line(&mut line).await {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = line.trim_end();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<WorkerMessage>(trimmed) {
                        Ok(msg) => return Some(msg),
                        Err(_) => continue,
                    }
                }
                Err(_) => return None,
            }
        }
    }

    async fn wait(&mut self) -> WorkerOutcome {
        match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(code) => WorkerOutcome::Exited { code: Some(code) },
                Err(_) => WorkerOutcome::Exited { code: None },
            },
            None => WorkerOutcome::Exited { code: None },
        }
    }

    async fn kill(&mut self) -> WorkerOutcome {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        WorkerOutcome::Killed
    }
}

async fn drive(process: InProcessWorkerProcess, config: SupervisorConfig, client: &FakeControlPlaneClient, event: &Event, memory_exceeded: Option<tokio::sync::oneshot::Receiver<()>>) {
    Supervisor::new(config).supervise(process, client, event, memory_exceeded).await.expect("supervises");
}

/// S1: a phase that extracts everything in one pass and emits `Done` well within the timeout.
struct SimpleExtractionPhase;

#[async_trait]
impl PhaseRunner<FakeControlPlaneClient, FakeUploadSink> for SimpleExtractionPhase {
    async fn run(&self, adapter: Arc<WorkerAdapter<FakeControlPlaneClient, FakeUploadSink>>) -> Result<(), AdapterError> {
        adapter.emit(TerminalEventType::DataExtractionDone, EmitOutcome::Done).await
    }
}

#[tokio::test(start_paused = true)]
async fn s1_simple_extraction_emits_done_without_supervisor_intervention() {
    let client = Arc::new(FakeControlPlaneClient::new());
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let ev = event(EventType::ExtractionDataStart);

    let mut process = InProcessWorkerProcess::spawn(client.clone(), clock, Arc::new(SimpleExtractionPhase));
    process
        .send_start_payload(&WorkerStartPayload { event: ev.clone(), initial_domain_mapping: None })
        .await
        .expect("send start payload");

    let config = SupervisorConfig { timeout: Duration::from_secs(5), ..SupervisorConfig::default() };
    drive(process, config, &client, &ev, None).await;

    let emitted = client.emitted();
    assert_eq!(emitted.len(), 1);
    assert!(matches!(emitted[0].payload.event_type, TerminalEventType::DataExtractionDone));
}

/// S2: a phase that checks cooperation between units of work and wraps up gracefully once the
/// supervisor's soft timeout signals it, instead of being killed.
struct CooperativeTimeoutPhase;

#[async_trait]
impl PhaseRunner<FakeControlPlaneClient, FakeUploadSink> for CooperativeTimeoutPhase {
    async fn run(&self, adapter: Arc<WorkerAdapter<FakeControlPlaneClient, FakeUploadSink>>) -> Result<(), AdapterError> {
        let cooperation = adapter.cooperation();
        while !cooperation.is_timeout() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        if cooperation.claim_timeout_handler() {
            adapter.emit(TerminalEventType::DataExtractionProgress, EmitOutcome::Progress { percent: Some(40) }).await?;
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn s2_soft_timeout_is_handled_gracefully_by_a_cooperating_phase() {
    let client = Arc::new(FakeControlPlaneClient::new());
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let ev = event(EventType::ExtractionDataStart);

    let mut process = InProcessWorkerProcess::spawn(client.clone(), clock, Arc::new(CooperativeTimeoutPhase));
    process
        .send_start_payload(&WorkerStartPayload { event: ev.clone(), initial_domain_mapping: None })
        .await
        .expect("send start payload");

    let config = SupervisorConfig { timeout: Duration::from_millis(20), ..SupervisorConfig::default() };
    drive(process, config, &client, &ev, None).await;

    let emitted = client.emitted();
    assert_eq!(emitted.len(), 1, "exactly one terminal event, emitted by the cooperating phase itself");
    assert!(matches!(emitted[0].payload.event_type, TerminalEventType::DataExtractionProgress));
}

/// S3/S6: a phase that blocks the event loop and never checks cooperation, standing in for a
/// connector bug (S3, rescued by the hard timeout) or a worker that the memory sampler has to
/// kill before the hard timeout ever fires (S6).
struct BlockedPhase;

#[async_trait]
impl PhaseRunner<FakeControlPlaneClient, FakeUploadSink> for BlockedPhase {
    async fn run(&self, _adapter: Arc<WorkerAdapter<FakeControlPlaneClient, FakeUploadSink>>) -> Result<(), AdapterError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn s3_a_blocked_event_loop_is_killed_by_the_hard_timeout_and_rescued_by_the_arbiter() {
    let client = Arc::new(FakeControlPlaneClient::new());
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let ev = event(EventType::ExtractionDataStart);

    let mut process = InProcessWorkerProcess::spawn(client.clone(), clock, Arc::new(BlockedPhase));
    process
        .send_start_payload(&WorkerStartPayload { event: ev.clone(), initial_domain_mapping: None })
        .await
        .expect("send start payload");

    let config = SupervisorConfig { timeout: Duration::from_millis(10), ..SupervisorConfig::default() };
    drive(process, config, &client, &ev, None).await;

    let emitted = client.emitted();
    assert_eq!(emitted.len(), 1);
    assert!(matches!(emitted[0].payload.event_type, TerminalEventType::DataExtractionError));
}

#[tokio::test(start_paused = true)]
async fn s6_a_worker_over_its_memory_cap_is_killed_and_rescued_by_the_arbiter() {
    let client = Arc::new(FakeControlPlaneClient::new());
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let ev = event(EventType::ExtractionDataStart);

    let mut process = InProcessWorkerProcess::spawn(client.clone(), clock, Arc::new(BlockedPhase));
    process
        .send_start_payload(&WorkerStartPayload { event: ev.clone(), initial_domain_mapping: None })
        .await
        .expect("send start payload");

    // A generous timeout, so the memory sampler's kill wins the race instead of the hard timeout.
    let config = SupervisorConfig { timeout: Duration::from_secs(600), ..SupervisorConfig::default() };
    let (tx, rx) = tokio::sync::oneshot::channel();
    tx.send(()).expect("signal memory cap exceeded");

    drive(process, config, &client, &ev, Some(rx)).await;

    let emitted = client.emitted();
    assert_eq!(emitted.len(), 1);
    assert!(matches!(emitted[0].payload.event_type, TerminalEventType::DataExtractionError));
}

/// S4: crossing the wire-size budget mid-extraction should signal a cooperative exit and let
/// the phase close out with a progress event instead of `Done`, with exactly one callback POST.
#[tokio::test]
async fn s4_crossing_the_wire_size_budget_yields_exactly_one_progress_callback() {
    use sg_engine::RepoDef;

    let client = Arc::new(FakeControlPlaneClient::new());
    client.seed_state("su-1", r#"{"snap_in_version_id":"v1"}"#);
    let uploader = Arc::new(FakeUploadSink::new());
    let notifier: Arc<dyn SupervisorNotifier> = Arc::new(sg_engine::fake::FakeNotifier::new());
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let ev = event(EventType::ExtractionDataStart);

    let adapter = Arc::new(WorkerAdapter::new(
        client.clone(),
        uploader,
        ev,
        AdapterState::default(),
        clock,
        notifier,
        Arc::new(Cooperation::new()),
    ));
    adapter.initialize_repos(vec![RepoDef::new("contacts")]).await;

    // Push enough large batches to cross `PENDING_SIZE_BYTES_THRESHOLD`, the same technique
    // used to unit test this invariant at the adapter level.
    for _ in 0..60 {
        adapter.push("contacts", vec![serde_json::json!({"blob": "x".repeat(1_000)})]).await.expect("push");
        adapter.flush_all().await.expect("flush");
        if adapter.cooperation().is_timeout() {
            break;
        }
    }
    assert!(adapter.cooperation().is_timeout(), "expected the wire-size budget to trip");

    adapter.emit(TerminalEventType::DataExtractionProgress, EmitOutcome::Progress { percent: None }).await.expect("emit");
    adapter
        .emit(TerminalEventType::DataExtractionDone, EmitOutcome::Done)
        .await
        .expect("a Done emit after timeout is a dropped no-op, not an error");

    let emitted = client.emitted();
    assert_eq!(emitted.len(), 1, "the blocked Done must not produce a second callback");
    assert!(matches!(emitted[0].payload.event_type, TerminalEventType::DataExtractionProgress));
}

/// S5: a control-plane callback that returns 429 with `Retry-After: 3` must be retried exactly
/// once (honoring the delay) rather than surfaced as a failure.
async fn spawn_single_shot_429_then_ok_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            use tokio::io::AsyncReadExt;
            let idx = count_clone.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = if idx == 0 {
                "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 3\r\nContent-Length: 0\r\n\r\n".to_string()
            } else {
                "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}".to_string()
            };
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    (format!("http://{addr}"), count)
}

#[tokio::test(start_paused = true)]
async fn s5_a_429_with_retry_after_is_retried_once_the_delay_elapses() {
    let (base, count) = spawn_single_shot_429_then_ok_server().await;
    let client = HttpControlPlaneClient::new(Endpoints { platform_endpoint: String::new() });
    let payload = sg_client::TerminalEventPayload::done(TerminalEventType::DataExtractionDone, vec![]);

    let callback_url = format!("{base}/cb");
    client.emit(&callback_url, "tok", &payload).await.expect("eventually succeeds after the 429");

    assert_eq!(count.load(Ordering::SeqCst), 2, "one 429 response, one retried request");
}

/// The arbiter's "no script resolved" path never spawns a worker at all; covered directly here
/// since the reference binaries' empty `PhaseRegistry` always takes it.
#[tokio::test]
async fn unresolved_script_posts_the_canonical_error_without_a_worker() {
    let client = FakeControlPlaneClient::new();
    let ev = event(EventType::ExtractionAttachmentsStart);

    Arbiter::resolve_unresolved_script(&client, &ev).await.expect("resolves");

    let emitted = client.emitted();
    assert_eq!(emitted.len(), 1);
    assert!(matches!(emitted[0].payload.event_type, TerminalEventType::AttachmentExtractionError));
}
