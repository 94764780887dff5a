// SPDX-License-Identifier: MIT

//! Shared size and batching constants.
//!
//! These were defined twice (under slightly different names) in the system this crate
//! implements; here each has exactly one definition.

use std::time::Duration;

/// Hard ceiling on a single outbound event payload.
pub const MAX_EVENT_SIZE_BYTES: usize = 200_000;

/// Cooperative early-exit threshold: once pending outbound bytes cross this, the worker
/// should stop batching and emit a progress event instead of risking `MAX_EVENT_SIZE_BYTES`.
pub const PENDING_SIZE_BYTES_THRESHOLD: usize = MAX_EVENT_SIZE_BYTES * 8 / 10;

/// Items buffered per item type before a repository auto-flushes.
pub const ARTIFACT_BATCH_SIZE: usize = 2_000;

/// Largest artifact a single upload will stream before refusing.
pub const MAX_ARTIFACT_SIZE_BYTES: u64 = 250 * 1024 * 1024;

/// Longest error message forwarded in a terminal event.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 1_000;

/// Longest filename kept verbatim before truncation.
pub const FILENAME_MAX_CHARS: usize = 256;

/// Default bounded concurrency for the attachment streaming pool.
pub const ATTACHMENT_POOL_DEFAULT_BATCH_SIZE: usize = 10;

/// Default soft timeout; also the ceiling a configured timeout is capped against.
pub const DEFAULT_SOFT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Hard timeout is this multiple of the soft timeout.
pub const HARD_TIMEOUT_RATIO: f64 = 1.3;

/// How often the supervisor samples worker memory usage.
pub const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum attempts (including the first) spent retrying a single control-plane call.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Truncate a filename to at most [`FILENAME_MAX_CHARS`], keeping a readable prefix and the
/// last 20 characters (commonly the extension and a hash suffix).
pub fn truncate_filename(name: &str) -> String {
    if name.chars().count() <= FILENAME_MAX_CHARS {
        return name.to_string();
    }
    let chars: Vec<char> = name.chars().collect();
    let tail: String = chars[chars.len() - 20..].iter().collect();
    let keep = FILENAME_MAX_CHARS - 3 - tail.chars().count();
    let prefix: String = chars[..keep].iter().collect();
    format!("{prefix}...{tail}")
}

/// Truncate an error message to [`ERROR_MESSAGE_MAX_CHARS`] characters.
pub fn truncate_error_message(message: &str) -> String {
    if message.chars().count() <= ERROR_MESSAGE_MAX_CHARS {
        return message.to_string();
    }
    message.chars().take(ERROR_MESSAGE_MAX_CHARS).collect()
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
