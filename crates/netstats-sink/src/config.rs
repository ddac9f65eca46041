// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sender configuration.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of points per write.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Default capacity of the pending-point queue.
pub const DEFAULT_QUEUE_SIZE: usize = 65535;

/// Default interval between time-based flushes (seconds).
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;

/// Default timeout of the connectivity probe (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default cool-down between failed writes (seconds).
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 30;

/// Connection and batching settings for one store.
///
/// Zero sizes and intervals are not errors: [`SenderConfig::effective`]
/// replaces them with the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Store URL (e.g., "http://localhost:8086").
    pub url: String,

    /// Username, if the store requires authentication.
    #[serde(default)]
    pub username: String,

    /// Password. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Target database.
    pub database: String,

    /// Retention policy (empty = "default").
    #[serde(default)]
    pub retention_policy: String,

    /// Write consistency hint passed through to the store.
    #[serde(default)]
    pub consistency: Option<String>,

    /// Points per write.
    #[serde(default)]
    pub batch_size: usize,

    /// Capacity of the pending-point queue.
    #[serde(default)]
    pub queue_size: usize,

    /// Seconds between time-based flushes.
    #[serde(default)]
    pub flush_interval_secs: u64,

    /// Connectivity probe timeout (seconds).
    #[serde(default)]
    pub timeout_secs: u64,

    /// Cool-down between failed writes (seconds).
    #[serde(default)]
    pub retry_interval_secs: u64,

    /// Upper bound of random jitter added to the cool-down (milliseconds).
    #[serde(default)]
    pub retry_jitter_ms: u64,
}

impl SenderConfig {
    /// Create a configuration with every tunable left at its default.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            password: String::new(),
            database: database.into(),
            retention_policy: String::new(),
            consistency: None,
            batch_size: 0,
            queue_size: 0,
            flush_interval_secs: 0,
            timeout_secs: 0,
            retry_interval_secs: 0,
            retry_jitter_ms: 0,
        }
    }

    /// Set the batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the queue size.
    pub fn queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Set the flush interval.
    pub fn flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }

    /// Set the retention policy.
    pub fn retention_policy(mut self, policy: impl Into<String>) -> Self {
        self.retention_policy = policy.into();
        self
    }

    /// Set credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Return a copy with zero values replaced by defaults.
    pub fn effective(&self) -> Self {
        let mut out = self.clone();
        if out.batch_size == 0 {
            out.batch_size = DEFAULT_BATCH_SIZE;
        }
        if out.queue_size == 0 {
            out.queue_size = DEFAULT_QUEUE_SIZE;
        }
        if out.flush_interval_secs == 0 {
            out.flush_interval_secs = DEFAULT_FLUSH_INTERVAL_SECS;
        }
        if out.timeout_secs == 0 {
            out.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if out.retry_interval_secs == 0 {
            out.retry_interval_secs = DEFAULT_RETRY_INTERVAL_SECS;
        }
        out
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.retry_interval_secs))
            .with_jitter(Duration::from_millis(self.retry_jitter_ms))
    }

    /// Host part of the URL, for display.
    pub fn hostname(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let authority = rest.split('/').next().unwrap_or(rest);
        authority.split(':').next().unwrap_or(authority)
    }
}
