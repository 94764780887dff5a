// SPDX-License-Identifier: MIT

//! Centralized environment-variable access for the supervisor's configuration surface, mirroring
//! the fallback-chain pattern the teacher uses for its own daemon configuration: read an
//! override, fall back to a default, never panic on a missing or malformed value.

use std::time::Duration;

pub fn timeout() -> Option<Duration> {
    std::env::var("SYNCGUARD_TIMEOUT_MS").ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

pub fn batch_size() -> Option<usize> {
    std::env::var("SYNCGUARD_BATCH_SIZE").ok().and_then(|s| s.parse::<usize>().ok())
}

pub fn enable_memory_limits() -> Option<bool> {
    std::env::var("SYNCGUARD_ENABLE_MEMORY_LIMITS").ok().and_then(|s| s.parse::<bool>().ok())
}

pub fn test_memory_limit_mb() -> Option<u64> {
    std::env::var("SYNCGUARD_TEST_MEMORY_LIMIT_MB").ok().and_then(|s| s.parse::<u64>().ok())
}

pub fn is_local_development() -> Option<bool> {
    std::env::var("SYNCGUARD_LOCAL").ok().and_then(|s| s.parse::<bool>().ok())
}

pub fn platform_memory_mb() -> Option<u64> {
    std::env::var("SYNCGUARD_PLATFORM_MEMORY_MB").ok().and_then(|s| s.parse::<u64>().ok())
}
