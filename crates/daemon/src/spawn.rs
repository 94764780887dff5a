// SPDX-License-Identifier: MIT

//! Spawns the worker as a genuine child OS process: re-executes the current binary with a
//! `--worker` flag, optionally wrapped in a `sh -c 'ulimit -v ...; exec ...'` shim to cap its
//! address space without `unsafe` (the workspace forbids `unsafe_code`, so a `pre_exec` /
//! `setrlimit` call is not an option — `ulimit` via a shell wrapper gets the same RLIMIT_AS cap
//! using only safe code). Grounded on the teacher's `tokio::process::Command` construction,
//! env forwarding, and reaper-task idiom in
//! `crates/daemon/src/adapters/agent/coop/spawn.rs`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::SupervisorError;
use crate::message::{encode_line, SupervisorMessage, WorkerMessage};
use crate::process::{WorkerOutcome, WorkerProcess};

/// Builds the argv the worker process is launched with. A pure function so the memory-cap
/// wrapping logic is unit-testable without actually spawning anything.
///
/// When `memory_cap_mb` is `Some`, the worker is wrapped in a `sh -c` invocation that sets a
/// virtual-memory `ulimit` before `exec`ing the real binary, so the shell process is replaced in
/// place (no extra process in the tree, no PID to track beyond the shell's).
pub fn build_worker_argv(exe: &Path, memory_cap_mb: Option<u64>) -> (String, Vec<String>) {
    let exe_str = exe.to_string_lossy().to_string();
    match memory_cap_mb {
        Some(mb) => {
            let kb = mb.saturating_mul(1024);
            let script = format!("ulimit -v {kb}; exec \"$0\" --worker");
            ("sh".to_string(), vec!["-c".to_string(), script, exe_str])
        }
        None => (exe_str, vec!["--worker".to_string()]),
    }
}

/// Spawns the worker process for `exe`, applying `memory_cap_mb` via [`build_worker_argv`].
pub fn spawn_worker(exe: &Path, memory_cap_mb: Option<u64>) -> std::io::Result<Child> {
    let (program, args) = build_worker_argv(exe, memory_cap_mb);
    Command::new(program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Real [`WorkerProcess`] backed by a [`tokio::process::Child`]: newline-delimited JSON over
/// stdin/stdout, stderr forwarded line-by-line to `tracing` as a reaper task (matching the
/// teacher's `wait_with_output` reaper-task idiom, adapted to streaming rather than buffering
/// the whole output).
pub struct RealWorkerProcess {
    child: Child,
    stdin: tokio::process::ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
}

impl RealWorkerProcess {
    pub fn new(mut child: Child) -> Result<Self, SupervisorError> {
        let stdin = child.stdin.take().ok_or_else(|| SupervisorError::Spawn("worker stdin not piped".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| SupervisorError::Spawn("worker stdout not piped".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(worker_stderr = %line, "worker process stderr");
                }
            });
        }
        Ok(Self { child, stdin, stdout: BufReader::new(stdout) })
    }

    /// Writes the initial invocation payload (the event, initial connector state, and initial
    /// domain mapping) as the worker's first stdin line.
    pub async fn send_start_payload<T: serde::Serialize>(&mut self, payload: &T) -> Result<(), SupervisorError> {
        let line = encode_line(payload).map_err(|e| SupervisorError::Stdin(e.to_string()))?;
        self.stdin.write_all(line.as_bytes()).await.map_err(|e| SupervisorError::Stdin(e.to_string()))
    }
}

#[async_trait]
impl WorkerProcess for RealWorkerProcess {
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
                        Err(e) => {
                            tracing::warn!(raw = %trimmed, error = %e, "dropping unparseable worker message");
                            continue;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "error reading worker stdout");
                    return None;
                }
            }
        }
    }

    async fn wait(&mut self) -> WorkerOutcome {
        match self.child.wait().await {
            Ok(status) => WorkerOutcome::Exited { code: status.code() },
            Err(e) => {
                tracing::warn!(error = %e, "error waiting on worker process");
                WorkerOutcome::Exited { code: None }
            }
        }
    }

    async fn kill(&mut self) -> WorkerOutcome {
        if let Err(e) = self.child.start_kill() {
            tracing::warn!(error = %e, "error sending kill to worker process");
        }
        let _ = self.child.wait().await;
        WorkerOutcome::Killed
    }
}
