// SPDX-License-Identifier: MIT

//! The terminal-event arbiter: guarantees exactly one terminal event reaches the platform per
//! invocation, even when the hard-timeout kill path and the ordinary worker-exit path race to
//! resolve the same invocation.

use std::sync::atomic::{AtomicBool, Ordering};

use sg_client::{ControlPlaneClient, TerminalEventPayload};
use sg_core::{Event, EventType};

/// Idempotent resolver for one invocation. `resolve` may be called from both the "child exited,
/// routing its last message" path and the "hard-timeout fired, force-killing" path; whichever
/// observes `false` first performs the compare-and-swap and emits, the other becomes a no-op.
#[derive(Default)]
pub struct Arbiter {
    already_arbitrated: AtomicBool,
}

impl Arbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the invocation: if the worker already emitted its own terminal event,
    /// this is a no-op. Otherwise POSTs the canonical error event for `event.event_type`
    /// (or [`EventType::Unknown`]'s `UnknownEventType` when the event type didn't even
    /// resolve to a worker script).
    ///
    /// Safe to call more than once; only the first caller to win the internal
    /// compare-and-swap actually emits.
    pub async fn resolve<C: ControlPlaneClient>(
        &self,
        client: &C,
        event: &Event,
        already_emitted: bool,
    ) -> Result<(), sg_client::ClientError> {
        if already_emitted {
            return Ok(());
        }
        if self.already_arbitrated.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Ok(());
        }

        let canonical = event.event_type.canonical_error_event();
        let payload = TerminalEventPayload::error(
            canonical,
            "Worker exited the process without emitting an event. \
             This usually indicates a crash, an out-of-memory condition, or a hard timeout."
                .to_string(),
        );
        client.emit(&event.event_context.callback_url, &event.context.secrets.service_account_token, &payload).await
    }

    /// Resolves an event type directly, for the "script never resolved" path (spec.md §4.6 step
    /// 1), which has no worker process and therefore no `already_emitted` state to check.
    pub async fn resolve_unresolved_script<C: ControlPlaneClient>(
        client: &C,
        event: &Event,
    ) -> Result<(), sg_client::ClientError> {
        let canonical = if matches!(event.event_type, EventType::Unknown) {
            sg_core::TerminalEventType::UnknownEventType
        } else {
            event.event_type.canonical_error_event()
        };
        let payload = TerminalEventPayload::error(canonical, "No worker script is registered for this event type.".to_string());
        client.emit(&event.event_context.callback_url, &event.context.secrets.service_account_token, &payload).await
    }
}
