// SPDX-License-Identifier: MIT

//! Background memory sampling for the worker process: polls `/proc/<pid>/status` on an
//! interval and signals once resident memory crosses the configured cap, so the supervisor
//! can kill the worker the same way it does for a hard timeout.

use std::time::Duration;

use tokio::sync::oneshot;

use sg_core::limits::MEMORY_SAMPLE_INTERVAL;

/// Parses the `VmRSS` line out of the contents of a `/proc/<pid>/status` file. Returns `None`
/// if the file has no `VmRSS` line or its value doesn't parse (the process may already have
/// exited between the read and the parse).
pub fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix("VmRSS:")?;
        rest.trim().split_whitespace().next()?.parse::<u64>().ok()
    })
}

/// Reads and parses `/proc/<pid>/status`'s `VmRSS` line for a live process. Returns `None` if
/// the file can't be read (the process has already exited) or has no usable `VmRSS` line.
fn sample_rss_kb(pid: u32) -> Option<u64> {
    let contents = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    parse_vm_rss_kb(&contents)
}

/// Spawns a background task sampling `pid`'s resident memory every [`MEMORY_SAMPLE_INTERVAL`].
/// Sends once on the returned receiver the first time the sample exceeds `cap_mb`, then exits.
/// Dropping the receiver (or the supervisor shutting down first) simply leaves the spawned task
/// to exit on its own once `sample_rss_kb` starts returning `None`.
pub fn watch_memory(pid: u32, cap_mb: u64) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let cap_kb = cap_mb.saturating_mul(1024);
        loop {
            tokio::time::sleep(MEMORY_SAMPLE_INTERVAL).await;
            match sample_rss_kb(pid) {
                Some(rss_kb) if rss_kb > cap_kb => {
                    tracing::warn!(pid, rss_kb, cap_kb, "worker memory cap exceeded");
                    let _ = tx.send(());
                    return;
                }
                Some(_) => continue,
                None => return,
            }
        }
    });
    rx
}

/// Same as [`watch_memory`] but with an injectable sampling interval, for tests that can't
/// wait on the real 30 second cadence.
#[cfg(any(test, feature = "test-support"))]
pub fn watch_memory_with_interval(pid: u32, cap_mb: u64, interval: Duration) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let cap_kb = cap_mb.saturating_mul(1024);
        loop {
            tokio::time::sleep(interval).await;
            match sample_rss_kb(pid) {
                Some(rss_kb) if rss_kb > cap_kb => {
                    let _ = tx.send(());
                    return;
                }
                Some(_) => continue,
                None => return,
            }
        }
    });
    rx
}
