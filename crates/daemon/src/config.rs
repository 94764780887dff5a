// SPDX-License-Identifier: MIT

//! Supervisor configuration: the options spec.md §6 lists, each env-var overridable per
//! [`crate::env`], with [`SupervisorConfig::from_env`] layering defaults the same way
//! `sg_client::retry` layers pure policy over HTTP mechanics.

use std::time::Duration;

use sg_core::limits::DEFAULT_SOFT_TIMEOUT;

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// Soft timeout, capped at [`DEFAULT_SOFT_TIMEOUT`] regardless of what is requested.
    pub timeout: Duration,
    /// Attachment pool concurrency.
    pub batch_size: usize,
    pub enable_memory_limits: bool,
    /// Overrides the worker's memory cap for tests, bypassing the platform-memory calculation.
    pub test_memory_limit_mb: Option<u64>,
    /// When set, the uploader additionally mirrors batches to `extracted_files/` on disk.
    pub is_local_development: bool,
    /// Total memory available to the platform container; the worker's cap is derived from this
    /// minus a reserve for the parent.
    pub platform_memory_mb: u64,
}

/// Reserved for the supervisor's own heap; not available to the worker's memory cap.
const PARENT_RESERVE_MB: u64 = 64;

/// Conservative default platform memory when nothing else is known.
const DEFAULT_PLATFORM_MEMORY_MB: u64 = 512;

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SOFT_TIMEOUT,
            batch_size: sg_core::limits::ATTACHMENT_POOL_DEFAULT_BATCH_SIZE,
            enable_memory_limits: true,
            test_memory_limit_mb: None,
            is_local_development: false,
            platform_memory_mb: DEFAULT_PLATFORM_MEMORY_MB,
        }
    }
}

impl SupervisorConfig {
    /// Layers environment overrides over [`SupervisorConfig::default`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(timeout) = crate::env::timeout() {
            config.timeout = timeout.min(DEFAULT_SOFT_TIMEOUT);
        }
        if let Some(batch_size) = crate::env::batch_size() {
            config.batch_size = batch_size;
        }
        if let Some(enabled) = crate::env::enable_memory_limits() {
            config.enable_memory_limits = enabled;
        }
        if let Some(mb) = crate::env::test_memory_limit_mb() {
            config.test_memory_limit_mb = Some(mb);
        }
        if let Some(local) = crate::env::is_local_development() {
            config.is_local_development = local;
        }
        if let Some(mb) = crate::env::platform_memory_mb() {
            config.platform_memory_mb = mb;
        }
        config
    }

    /// The soft timeout: `min(configured, 10 min)`.
    pub fn soft_timeout(&self) -> Duration {
        self.timeout.min(DEFAULT_SOFT_TIMEOUT)
    }

    /// The hard timeout: `1.3 * soft_timeout`.
    pub fn hard_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.soft_timeout().as_secs_f64() * sg_core::limits::HARD_TIMEOUT_RATIO)
    }

    /// The worker's memory cap in megabytes, or `None` when memory limits are disabled.
    ///
    /// A `test_memory_limit_mb` override always wins, for tests that need to force an OOM
    /// without allocating real platform-sized memory.
    pub fn worker_memory_cap_mb(&self) -> Option<u64> {
        if !self.enable_memory_limits {
            return None;
        }
        if let Some(test_cap) = self.test_memory_limit_mb {
            return Some(test_cap);
        }
        Some(self.platform_memory_mb.saturating_sub(PARENT_RESERVE_MB).max(1))
    }
}
