// SPDX-License-Identifier: MIT

//! Resolves the worker script for an invocation's event type.
//!
//! Since the supervisor and worker share one binary (the worker is this same binary re-executed
//! with `--worker`, per [`crate::spawn`]), "the worker script" isn't a separate file on disk — it
//! is whichever [`PhaseRunner`] a connector registered in-process for that event type. The phase
//! logic itself is an external collaborator this crate never implements; an unregistered event
//! type resolves to `None`, which the supervisor treats exactly like spec.md's "no script
//! resolved" case and routes straight to the arbiter's `resolve_unresolved_script`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sg_adapters::UploadSink;
use sg_client::ControlPlaneClient;
use sg_core::EventType;
use sg_engine::{AdapterError, WorkerAdapter};

/// One phase's entry point: given the fully initialized worker adapter, drives extraction or
/// loading to completion, including calling `adapter.emit(...)` before returning `Ok(())`.
#[async_trait]
pub trait PhaseRunner<C, U>: Send + Sync
where
    C: ControlPlaneClient + 'static,
    U: UploadSink + 'static,
{
    async fn run(&self, adapter: Arc<WorkerAdapter<C, U>>) -> Result<(), AdapterError>;
}

/// Maps event types to the connector-registered [`PhaseRunner`] that handles them. Empty by
/// default; a connector binary built on this crate populates it at startup.
pub struct PhaseRegistry<C, U>
where
    C: ControlPlaneClient + 'static,
    U: UploadSink + 'static,
{
    runners: HashMap<EventType, Arc<dyn PhaseRunner<C, U>>>,
}

impl<C, U> Default for PhaseRegistry<C, U>
where
    C: ControlPlaneClient + 'static,
    U: UploadSink + 'static,
{
    fn default() -> Self {
        Self { runners: HashMap::new() }
    }
}

impl<C, U> PhaseRegistry<C, U>
where
    C: ControlPlaneClient + 'static,
    U: UploadSink + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event_type: EventType, runner: Arc<dyn PhaseRunner<C, U>>) {
        self.runners.insert(event_type, runner);
    }

    /// Resolves the runner registered for `event_type`, or `None` if none was registered
    /// (including for [`EventType::Unknown`], which never resolves).
    pub fn resolve(&self, event_type: &EventType) -> Option<Arc<dyn PhaseRunner<C, U>>> {
        if matches!(event_type, EventType::Unknown) {
            return None;
        }
        self.runners.get(event_type).cloned()
    }
}
