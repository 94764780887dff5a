// SPDX-License-Identifier: MIT

//! Fatal-to-worker error taxonomy.
//!
//! These are the failures that abort the invocation outright rather than being reported as a
//! phase-level error event — the worker process exits non-zero and the supervisor's arbiter
//! maps the exit into the canonical error event for the event type in play.

#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("fetching adapter state failed: {0}")]
    StateFetch(String),

    #[error("adapter state document is not valid JSON: {0}")]
    StateParse(String),

    #[error("saving adapter state failed: {0}")]
    StateSave(String),

    #[error("initial domain mapping is required for snap-in version {version} but none was supplied")]
    MissingInitialDomainMapping { version: String },

    #[error("initial domain mapping install failed: {0}")]
    InitialDomainMappingInstall(String),
}
