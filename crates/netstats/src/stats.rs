// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-target poll statistics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Default, Clone)]
struct Counters {
    gets: u64,
    errors: u64,
    last_error: Option<String>,
    last_error_time: Option<DateTime<Utc>>,
}

/// Statistics of one (host, query) pair.
///
/// Every update and every snapshot holds the lock only for the copy, so a
/// snapshot is always one whole prior state.
#[derive(Debug, Default)]
pub struct TargetStats {
    inner: Mutex<Counters>,
}

impl TargetStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful cycle.
    pub fn record_get(&self) {
        self.inner.lock().gets += 1;
    }

    /// Record a failed cycle and its error.
    pub fn record_error(&self, error: impl ToString, at: DateTime<Utc>) {
        let message = error.to_string();
        let mut inner = self.inner.lock();
        inner.errors += 1;
        inner.last_error = Some(message);
        inner.last_error_time = Some(at);
    }

    /// Point-in-time copy.
    pub fn snapshot(&self) -> TargetStatsSnapshot {
        let inner = self.inner.lock().clone();
        TargetStatsSnapshot {
            requests: inner.gets + inner.errors,
            gets: inner.gets,
            errors: inner.errors,
            last_error: inner.last_error,
            last_error_time: inner.last_error_time,
        }
    }
}

/// Copy of [`TargetStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetStatsSnapshot {
    /// Cycles attempted.
    pub requests: u64,
    /// Cycles that returned replies.
    pub gets: u64,
    /// Cycles that failed.
    pub errors: u64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}
