// SPDX-License-Identifier: MIT

//! Pure retry-policy arithmetic, kept free of any HTTP types so it can be unit tested without a
//! network stack.
//!
//! Policy: retry network errors and 5xx responses with capped exponential backoff up to
//! [`sg_core::limits::MAX_RETRY_ATTEMPTS`] attempts; retry 429 only when it carries a
//! non-negative integer `Retry-After` header, honoring that exact delay; never retry any other
//! 4xx.

use std::time::Duration;

use sg_core::limits::MAX_RETRY_ATTEMPTS;

/// Parse a `Retry-After` header value as whole seconds. Returns `None` for anything that isn't
/// a non-negative integer (including HTTP-date formatted values, which this client does not
/// retry on — only the documented integer-seconds case is honored).
pub fn retry_after_for_429(header: Option<&str>) -> Option<Duration> {
    let raw = header?.trim();
    let seconds: i64 = raw.parse().ok()?;
    if seconds < 0 {
        return None;
    }
    Some(Duration::from_secs(seconds as u64))
}

/// Capped exponential backoff for 5xx/network retries: 1s, 2s, 4s, ... capped at 30s.
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt.min(5)).unwrap_or(32);
    Duration::from_secs(secs.min(30))
}

/// Whether another attempt is allowed given how many have already been made.
pub fn attempts_remaining(attempts_made: u32) -> bool {
    attempts_made < MAX_RETRY_ATTEMPTS
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
