// SPDX-License-Identifier: MIT

//! The heartbeat / early-exit cooperator shared between the user task, the repository
//! buffers, and the attachment pool.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the in-worker state object may still be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAccess {
    Live,
    /// A terminal emit is imminent; writes are dropped and logged rather than applied.
    Frozen,
}

/// Tracks `isTimeout` and `onTimeoutExecuted` for one invocation.
///
/// `isTimeout` is set either when the supervisor's exit message arrives or when the
/// wire-size budget is crossed; `claim_timeout_handler` guarantees the user's `onTimeout`
/// handler runs at most once even if both triggers race.
#[derive(Default)]
pub struct Cooperation {
    is_timeout: AtomicBool,
    timeout_executed: AtomicBool,
}

impl Cooperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_timeout(&self) {
        self.is_timeout.store(true, Ordering::SeqCst);
    }

    pub fn is_timeout(&self) -> bool {
        self.is_timeout.load(Ordering::SeqCst)
    }

    /// Claims the right to run the timeout handler. Returns `true` on the call that wins the
    /// race, `false` on every subsequent call.
    pub fn claim_timeout_handler(&self) -> bool {
        self.timeout_executed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    pub fn state_access(&self) -> StateAccess {
        if self.is_timeout() {
            StateAccess::Frozen
        } else {
            StateAccess::Live
        }
    }
}

#[cfg(test)]
#[path = "cooperation_tests.rs"]
mod tests;
