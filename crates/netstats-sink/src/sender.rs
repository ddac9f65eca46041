// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batching sender with retry-until-success delivery.
//!
//! ```text
//! submit() --> bounded queue --> flush loop --> Batch --> PointStore::write
//!                                    ^                        |
//!                                    +---- cool-down, retry --+ (on error)
//! ```
//!
//! A full queue stalls `submit` instead of dropping points. A failed write
//! keeps the same batch and retries it after the cool-down, forever.

use crate::batch::Batch;
use crate::config::SenderConfig;
use crate::point::{Fields, Point, PointError, Tags};
use crate::retry::RetryPolicy;
use crate::store::{PointStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Sender errors.
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("cannot reach store at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: StoreError,
    },

    #[error("store at {url} did not answer within {timeout_secs}s")]
    ProbeTimeout { url: String, timeout_secs: u64 },

    #[error("database '{database}' does not exist on {url}")]
    DatabaseNotFound { url: String, database: String },

    #[error("invalid point: {0}")]
    Point(#[from] PointError),

    #[error("sender loop has stopped")]
    Closed,
}

/// Callback invoked for every failed write, with the batch that will be retried.
pub type ErrorCallback = Arc<dyn Fn(&StoreError, &Batch) + Send + Sync>;

/// Counters for one sender.
#[derive(Debug, Default)]
pub struct SenderStats {
    /// Batches written successfully.
    pub batches_sent: AtomicU64,
    /// Points written successfully.
    pub points_sent: AtomicU64,
    /// Failed write attempts.
    pub write_errors: AtomicU64,
}

impl SenderStats {
    fn snapshot(&self, queued: usize) -> SenderStatsSnapshot {
        SenderStatsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            points_sent: self.points_sent.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            queued,
        }
    }
}

/// Snapshot of sender statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SenderStatsSnapshot {
    pub batches_sent: u64,
    pub points_sent: u64,
    pub write_errors: u64,
    /// Points waiting in the queue.
    pub queued: usize,
}

/// Entry point for building senders.
pub struct Sender;

impl Sender {
    /// Start building a sender for `config`.
    pub fn builder(config: SenderConfig) -> SenderBuilder {
        SenderBuilder::new(config)
    }

    /// Connect with the default error callback and the configured retry policy.
    pub async fn connect<S: PointStore>(
        config: SenderConfig,
        store: S,
    ) -> Result<SenderHandle, SenderError> {
        Self::builder(config).connect(store).await
    }
}

/// Builder for a [`SenderHandle`].
pub struct SenderBuilder {
    config: SenderConfig,
    on_error: Option<ErrorCallback>,
    retry: Option<RetryPolicy>,
}

impl SenderBuilder {
    fn new(config: SenderConfig) -> Self {
        Self {
            config: config.effective(),
            on_error: None,
            retry: None,
        }
    }

    /// Report failed writes to `callback` instead of the log.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&StoreError, &Batch) + Send + Sync + 'static,
    {
        let callback: ErrorCallback = Arc::new(callback);
        self.on_error = Some(callback);
        self
    }

    /// Override the retry policy derived from the configuration.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Probe the store, check the database, then start the flush loop.
    ///
    /// Nothing is accepted before both checks pass.
    pub async fn connect<S: PointStore>(self, store: S) -> Result<SenderHandle, SenderError> {
        let config = self.config;
        tracing::info!("Connecting to store {} (db {})", config.url, config.database);

        match tokio::time::timeout(config.timeout(), store.ping()).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                return Err(SenderError::Unreachable {
                    url: config.url.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(SenderError::ProbeTimeout {
                    url: config.url.clone(),
                    timeout_secs: config.timeout_secs,
                })
            }
        }

        let exists = match tokio::time::timeout(
            config.timeout(),
            store.database_exists(&config.database),
        )
        .await
        {
            Ok(result) => result.map_err(|source| SenderError::Unreachable {
                url: config.url.clone(),
                source,
            })?,
            Err(_) => {
                return Err(SenderError::ProbeTimeout {
                    url: config.url.clone(),
                    timeout_secs: config.timeout_secs,
                })
            }
        };
        if !exists {
            return Err(SenderError::DatabaseNotFound {
                url: config.url.clone(),
                database: config.database.clone(),
            });
        }

        tracing::info!("Connected to store {}", config.url);

        let (tx, rx) = mpsc::channel(config.queue_size);
        let stats = Arc::new(SenderStats::default());
        let flush_requested = Arc::new(Notify::new());
        let retry = self.retry.unwrap_or_else(|| config.retry_policy());
        let on_error: ErrorCallback = match self.on_error {
            Some(callback) => callback,
            None => {
                let url = config.url.clone();
                Arc::new(move |err: &StoreError, batch: &Batch| {
                    tracing::warn!(
                        "Write of {} points to {} failed, retrying: {}",
                        batch.len(),
                        url,
                        err
                    );
                })
            }
        };

        let flush_loop = FlushLoop {
            store,
            rx,
            batch: Batch::new(
                config.database.clone(),
                config.retention_policy.clone(),
                config.batch_size,
            ),
            flush_interval: config.flush_interval(),
            retry,
            on_error,
            stats: stats.clone(),
            flush_requested: flush_requested.clone(),
            url: config.url.clone(),
        };
        tokio::spawn(flush_loop.run());

        Ok(SenderHandle {
            tx,
            stats,
            flush_requested,
            config: Arc::new(config),
        })
    }
}

/// Cloneable handle used by producers to submit points.
#[derive(Clone)]
pub struct SenderHandle {
    tx: mpsc::Sender<Point>,
    stats: Arc<SenderStats>,
    flush_requested: Arc<Notify>,
    config: Arc<SenderConfig>,
}

impl SenderHandle {
    /// Build a point and queue it.
    ///
    /// Waits while the queue is full. Fails only if the point is malformed
    /// (nothing is queued then) or the flush loop is gone.
    pub async fn submit(
        &self,
        series: impl Into<String>,
        tags: Tags,
        fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SenderError> {
        let point = Point::new(series, tags, fields, timestamp)?;
        self.submit_point(point).await
    }

    /// Queue an already built point.
    pub async fn submit_point(&self, point: Point) -> Result<(), SenderError> {
        self.tx.send(point).await.map_err(|_| SenderError::Closed)
    }

    /// Ask the flush loop to write the current batch without waiting for the timer.
    pub fn flush(&self) {
        self.flush_requested.notify_one();
    }

    /// Current counters.
    pub fn stats(&self) -> SenderStatsSnapshot {
        let queued = self.tx.max_capacity() - self.tx.capacity();
        self.stats.snapshot(queued)
    }

    /// Effective configuration (defaults applied).
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }
}

struct FlushLoop<S> {
    store: S,
    rx: mpsc::Receiver<Point>,
    batch: Batch,
    flush_interval: std::time::Duration,
    retry: RetryPolicy,
    on_error: ErrorCallback,
    stats: Arc<SenderStats>,
    flush_requested: Arc<Notify>,
    url: String,
}

impl<S: PointStore> FlushLoop<S> {
    async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                point = self.rx.recv() => {
                    match point {
                        Some(point) => {
                            if self.batch.push(point) {
                                self.flush().await;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
                _ = self.flush_requested.notified() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }

        // Every handle is gone; deliver what is left.
        if !self.batch.is_empty() {
            self.flush().await;
        }
        tracing::debug!("Sender loop for {} finished", self.url);
    }

    /// Write the current batch, retrying the same batch until it succeeds.
    async fn flush(&mut self) {
        loop {
            match self.store.write(&self.batch).await {
                Ok(()) => {
                    let written = self.batch.take();
                    self.stats.batches_sent.fetch_add(1, Ordering::Relaxed);
                    self.stats
                        .points_sent
                        .fetch_add(written.len() as u64, Ordering::Relaxed);
                    tracing::debug!("Wrote {} points to {}", written.len(), self.url);
                    return;
                }
                Err(err) => {
                    self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                    (self.on_error)(&err, &self.batch);
                    self.retry.wait().await;
                }
            }
        }
    }
}
