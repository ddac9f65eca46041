// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-series store abstraction
//!
//! The sender never speaks a store's wire protocol itself. It drives a
//! [`PointStore`], which the embedding application implements for its client.
//!
//! # Integration
//!
//! ```ignore
//! impl PointStore for InfluxClient {
//!     async fn ping(&self) -> Result<(), StoreError> { /* GET /ping */ }
//!     async fn database_exists(&self, db: &str) -> Result<bool, StoreError> { /* SHOW DATABASES */ }
//!     async fn write(&self, batch: &Batch) -> Result<(), StoreError> {
//!         // POST /write?db=..&rp=.. with batch.to_line_protocol()
//!     }
//! }
//! ```

use crate::batch::Batch;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Errors reported by a store client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("operation timed out")]
    Timeout,
}

/// Store write contract.
///
/// `ping` and `database_exists` are only used while a sender is being built;
/// `write` is called by the flush loop for every batch, and must write the
/// whole batch or nothing.
pub trait PointStore: Send + Sync + 'static {
    /// Liveness probe.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether `database` exists on the store.
    fn database_exists(
        &self,
        database: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Write one batch.
    fn write(&self, batch: &Batch) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: PointStore> PointStore for Arc<T> {
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).ping()
    }

    fn database_exists(
        &self,
        database: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).database_exists(database)
    }

    fn write(&self, batch: &Batch) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).write(batch)
    }
}

/// Store that logs every batch instead of writing it.
///
/// Every database exists and every write succeeds. Useful for checking what
/// a collector would send without a store to send it to.
#[derive(Debug, Default)]
pub struct DryRunStore {
    batches: AtomicU64,
    points: AtomicU64,
}

impl DryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches logged so far.
    pub fn batches_logged(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Points logged so far.
    pub fn points_logged(&self) -> u64 {
        self.points.load(Ordering::Relaxed)
    }
}

impl PointStore for DryRunStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn database_exists(&self, _database: &str) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn write(&self, batch: &Batch) -> Result<(), StoreError> {
        tracing::info!(
            "[dry-run] {} point(s) for {}.{}",
            batch.len(),
            batch.database(),
            batch.retention_policy()
        );
        for point in batch.points() {
            tracing::info!("[dry-run] {}", point.to_line_protocol());
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.points.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// One call to [`MockStore::write`].
#[derive(Debug, Clone)]
pub struct WriteAttempt {
    /// When the attempt was made (tokio clock).
    pub at: Instant,
    /// The batch that was offered.
    pub batch: Batch,
    /// Whether the attempt succeeded.
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct MockState {
    databases: Vec<String>,
    ping_error: Option<StoreError>,
    failures_left: usize,
    always_fail: bool,
    attempts: Vec<WriteAttempt>,
}

/// In-memory store with scriptable failures.
#[derive(Debug, Default)]
pub struct MockStore {
    state: Mutex<MockState>,
    changed: Notify,
}

impl MockStore {
    /// Create a store that knows `databases` and accepts every write.
    pub fn new<I, S>(databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        store.state.lock().databases = databases.into_iter().map(Into::into).collect();
        store
    }

    /// Make the liveness probe fail.
    pub fn fail_ping(&self, error: StoreError) {
        self.state.lock().ping_error = Some(error);
    }

    /// Fail the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().failures_left = count;
    }

    /// Fail every write until [`MockStore::recover`] is called.
    pub fn fail_all_writes(&self) {
        self.state.lock().always_fail = true;
    }

    /// Stop failing writes.
    pub fn recover(&self) {
        let mut state = self.state.lock();
        state.always_fail = false;
        state.failures_left = 0;
    }

    /// Every write attempt so far.
    pub fn attempts(&self) -> Vec<WriteAttempt> {
        self.state.lock().attempts.clone()
    }

    /// Batches that were written successfully.
    pub fn written(&self) -> Vec<Batch> {
        self.state
            .lock()
            .attempts
            .iter()
            .filter(|a| a.succeeded)
            .map(|a| a.batch.clone())
            .collect()
    }

    /// Total number of points written successfully.
    pub fn points_written(&self) -> usize {
        self.state
            .lock()
            .attempts
            .iter()
            .filter(|a| a.succeeded)
            .map(|a| a.batch.len())
            .sum()
    }

    /// Wait until at least `count` write attempts have been made.
    pub async fn wait_for_attempts(&self, count: usize) {
        loop {
            let notified = self.changed.notified();
            if self.state.lock().attempts.len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Wait until at least `count` points have been written successfully.
    pub async fn wait_for_points(&self, count: usize) {
        loop {
            let notified = self.changed.notified();
            if self.points_written() >= count {
                return;
            }
            notified.await;
        }
    }
}

impl PointStore for MockStore {
    async fn ping(&self) -> Result<(), StoreError> {
        match self.state.lock().ping_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn database_exists(&self, database: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().databases.iter().any(|d| d == database))
    }

    async fn write(&self, batch: &Batch) -> Result<(), StoreError> {
        let result = {
            let mut state = self.state.lock();
            let fail = if state.always_fail {
                true
            } else if state.failures_left > 0 {
                state.failures_left -= 1;
                true
            } else {
                false
            };
            state.attempts.push(WriteAttempt {
                at: Instant::now(),
                batch: batch.clone(),
                succeeded: !fail,
            });
            if fail {
                Err(StoreError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        };
        self.changed.notify_waiters();
        result
    }
}
