// SPDX-License-Identifier: MIT

//! `sg-supervisor`: the reference supervisor binary built on `sg-daemon`.
//!
//! This binary re-executes itself as the worker process (`--worker`), so it has to dispatch on
//! that flag before anything else runs. There's no `clap` dependency here on purpose: the
//! surface is one boolean flag plus an event read from stdin, and `syncguard` (the `sg-cli`
//! binary) is the actual user-facing entry point that shells out to this one.
//!
//! The [`PhaseRegistry`] built below is empty: phase/connector logic is an external collaborator
//! this crate never implements (spec.md §1). Every invocation of this particular binary
//! therefore falls through to the "no script resolved" arbiter path. A real connector
//! deployment embeds `sg-daemon` as a library and links its own `main.rs` that populates the
//! registry before calling the same `Supervisor`/`run_worker` machinery.

use std::io::Read;
use std::sync::Arc;

use sg_adapters::Uploader;
use sg_client::{Endpoints, HttpControlPlaneClient};
use sg_core::{Event, SystemClock};
use sg_daemon::message::WorkerStartPayload;
use sg_daemon::worker::{listen_for_supervisor_messages, read_start_payload, run_worker, IpcNotifier};
use sg_daemon::{PhaseRegistry, RealWorkerProcess, Supervisor, SupervisorConfig};
use sg_engine::Cooperation;

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn read_event_from_stdin() -> Result<Event, Box<dyn std::error::Error>> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    Ok(serde_json::from_str(&raw)?)
}

fn registry() -> PhaseRegistry<HttpControlPlaneClient, Uploader<HttpControlPlaneClient>> {
    // Intentionally empty; see the module doc comment above.
    PhaseRegistry::new()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let worker_mode = std::env::args().any(|a| a == "--worker");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    if worker_mode {
        runtime.block_on(worker_main())
    } else {
        runtime.block_on(supervisor_main())
    }
}

async fn supervisor_main() -> Result<(), Box<dyn std::error::Error>> {
    let event = read_event_from_stdin()?;
    let config = SupervisorConfig::from_env();
    let client = HttpControlPlaneClient::new(Endpoints { platform_endpoint: event.execution_metadata.platform_endpoint.clone() });
    let registry = registry();

    let Some(_runner) = registry.resolve(&event.event_type) else {
        sg_daemon::Arbiter::resolve_unresolved_script(&client, &event).await?;
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

async fn worker_main() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdin = stdin;
    let payload = read_start_payload(&mut stdin).await?;

    let cooperation = Arc::new(Cooperation::new());
    listen_for_supervisor_messages(stdin, cooperation.clone());

    let client = Arc::new(HttpControlPlaneClient::new(Endpoints {
        platform_endpoint: payload.event.execution_metadata.platform_endpoint.clone(),
    }));
    let uploader = Arc::new(Uploader::new(client.clone(), payload.event.context.secrets.service_account_token.clone()));
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
