// SPDX-License-Identifier: MIT

//! `syncguard`: the user-facing entrypoint for the supervisor/worker runtime.
//!
//! CLI surface is deliberately small (spec.md §1 lists flag parsing beyond event-file-path and
//! `--local` as out of scope): one required event file, one local-development toggle, and a
//! hidden `--worker` flag the binary passes to itself when it re-executes as the worker half of
//! the split (see `sg_daemon::spawn`). `--worker` is hidden from `--help` because it is never
//! meant to be typed by a human; it exists only so `std::env::current_exe()` re-exec lands back
//! in this same binary regardless of which of `syncguard`/`sg-supervisor` the operator invoked.
//!
//! Like `sg-supervisor`, this binary's `PhaseRegistry` is empty: phase/connector logic is an
//! external collaborator (spec.md §1), so every invocation here falls through to the arbiter's
//! "no script resolved" path. A connector deployment links its own thin binary against
//! `sg-daemon` instead of using this one.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use sg_adapters::Uploader;
use sg_client::{Endpoints, HttpControlPlaneClient};
use sg_core::{Event, SystemClock};
use sg_daemon::message::WorkerStartPayload;
use sg_daemon::worker::{listen_for_supervisor_messages, read_start_payload, run_worker, IpcNotifier};
use sg_daemon::{Arbiter, PhaseRegistry, RealWorkerProcess, Supervisor, SupervisorConfig};
use sg_engine::Cooperation;

#[derive(Parser, Debug)]
#[command(name = "syncguard", version, about = "Supervised worker-execution runtime for data-sync invocations")]
struct Cli {
    /// Path to the invocation event JSON. Required unless `--worker` is set.
    #[arg(long)]
    event_file: Option<PathBuf>,

    /// Mirror uploaded batches to extracted_files/ on disk instead of only uploading them.
    #[arg(long)]
    local: bool,

    /// Internal: re-exec entrypoint for the worker half of the supervisor/worker split.
    #[arg(long, hide = true)]
    worker: bool,
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn registry() -> PhaseRegistry<HttpControlPlaneClient, Uploader<HttpControlPlaneClient>> {
    PhaseRegistry::new()
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    if cli.worker {
        runtime.block_on(worker_main())
    } else {
        let event_file = cli.event_file.ok_or_else(|| anyhow::anyhow!("--event-file is required unless --worker is set"))?;
        runtime.block_on(supervisor_main(event_file, cli.local))
    }
}

async fn supervisor_main(event_file: PathBuf, local: bool) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&event_file).await?;
    let event: Event = serde_json::from_str(&raw)?;

    if local {
        // Inherited by the spawned worker process, which reads it back through
        // `sg_daemon::env::is_local_development` since argv carries only `--worker`.
        std::env::set_var("SYNCGUARD_LOCAL", "true");
    }
    let config = SupervisorConfig::from_env();

    let client = HttpControlPlaneClient::new(Endpoints { platform_endpoint: event.execution_metadata.platform_endpoint.clone() });
    let registry = registry();

    let Some(_runner) = registry.resolve(&event.event_type) else {
        Arbiter::resolve_unresolved_script(&client, &event).await?;
        return Ok(());
    };

    let exe = std::env::current_exe()?;
    let child = sg_daemon::spawn::spawn_worker(&exe, config.worker_memory_cap_mb())?;
    let pid = child.id();
    let mut process = RealWorkerProcess::new(child)?;

    let payload = WorkerStartPayload { event: event.clone(), initial_domain_mapping: None };
    process.send_start_payload(&payload).await?;

    let memory_exceeded = match (config.worker_memory_cap_mb(), pid) {
        (Some(cap_mb), Some(pid)) => Some(sg_daemon::monitor::watch_memory(pid, cap_mb)),
        _ => None,
    };

    let supervisor = Supervisor::new(config);
    supervisor.supervise(process, &client, &event, memory_exceeded).await?;
    Ok(())
}

async fn worker_main() -> anyhow::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdin = stdin;
    let payload = read_start_payload(&mut stdin).await?;

    let cooperation = Arc::new(Cooperation::new());
    listen_for_supervisor_messages(stdin, cooperation.clone());

    let client = Arc::new(HttpControlPlaneClient::new(Endpoints {
        platform_endpoint: payload.event.execution_metadata.platform_endpoint.clone(),
    }));
    let is_local = sg_daemon::env::is_local_development().unwrap_or(false);
    let uploader = Arc::new(
        Uploader::new(client.clone(), payload.event.context.secrets.service_account_token.clone())
            .with_local_development(is_local),
    );
    let notifier = Arc::new(IpcNotifier::new(tokio::io::stdout()));
    let clock = Arc::new(SystemClock);

    let registry = registry();
    let code = match registry.resolve(&payload.event.event_type) {
        Some(runner) => run_worker(client, uploader, payload, notifier, clock, cooperation, runner).await,
        None => {
            tracing::error!("worker started for an event type with no registered phase runner");
            1
        }
    };

    std::process::exit(code);
}
