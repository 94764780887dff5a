// SPDX-License-Identifier: MIT

//! Supervisor-side errors: spawning the worker process and talking to the control plane on its
//! behalf (the arbiter's canonical-error emit).

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("no worker script is registered for event type {0}")]
    UnresolvedScript(String),

    #[error("failed to spawn worker process: {0}")]
    Spawn(String),

    #[error("failed to write to worker stdin: {0}")]
    Stdin(String),

    #[error("control-plane request failed: {0}")]
    ControlPlane(#[from] sg_client::ClientError),
}
