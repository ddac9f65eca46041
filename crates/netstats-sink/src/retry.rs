// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cool-down policy between failed writes.
//!
//! Writes are retried forever; the policy only decides how long to wait.

use std::time::Duration;

/// Fixed-interval retry policy with optional random jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    /// Create a policy that always waits `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            jitter: Duration::ZERO,
        }
    }

    /// Add up to `jitter` of random extra delay to every wait.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let max = self.jitter.as_millis().min(u64::MAX as u128) as u64;
        self.interval + Duration::from_millis(fastrand::u64(0..=max))
    }

    /// Sleep for [`RetryPolicy::delay`] on the tokio clock.
    pub async fn wait(&self) {
        tokio::time::sleep(self.delay()).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::DEFAULT_RETRY_INTERVAL_SECS))
    }
}
