// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Target poller: one device, one query, forever.
//!
//! ```text
//! tick --> PduSource::poll --> name --> normalize --> SenderHandle::submit
//!                |
//!                +-- error: record, reconnect, wait for the next tick
//! ```

use crate::control::{self, ControlHandle, ControlReceiver};
use crate::mib::MibTable;
use crate::naming::SeriesNamer;
use crate::pdu::{DeviceProfile, PduError, PduSource, QueryDefinition, Reply};
use crate::stats::{TargetStats, TargetStatsSnapshot};
use chrono::Utc;
use netstats_sink::{FieldValue, Fields, SenderError, SenderHandle, Tags};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

/// Poller construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    #[error("poll frequency for {key} must be positive")]
    NonPositiveFrequency { key: String },
}

/// Everything one poller needs to know.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub device: DeviceProfile,
    pub query: QueryDefinition,
    /// Time between cycle starts.
    pub frequency: Duration,
    /// Tags added to every point.
    pub static_tags: Tags,
    /// Stop after this many cycles; `None` polls forever.
    pub max_cycles: Option<u64>,
    /// Initial debug state.
    pub debug: bool,
}

impl PollerConfig {
    pub fn new(device: DeviceProfile, query: QueryDefinition, frequency: Duration) -> Self {
        Self {
            device,
            query,
            frequency,
            static_tags: Tags::new(),
            max_cycles: None,
            debug: false,
        }
    }

    /// Registry key: `<host>/<query>`.
    pub fn stats_key(&self) -> String {
        format!("{}/{}", self.device.host, self.query.name)
    }
}

/// Polls one (device, query) pair and feeds a sender.
pub struct TargetPoller<P> {
    config: PollerConfig,
    source: P,
    sender: SenderHandle,
    namer: SeriesNamer,
    stats: Arc<TargetStats>,
    control: ControlHandle,
    commands: ControlReceiver,
}

impl<P: PduSource> TargetPoller<P> {
    /// Fails when the frequency is zero.
    pub fn new(
        config: PollerConfig,
        mib: Arc<MibTable>,
        source: P,
        sender: SenderHandle,
    ) -> Result<Self, PollerError> {
        if config.frequency.is_zero() {
            return Err(PollerError::NonPositiveFrequency {
                key: config.stats_key(),
            });
        }

        let namer = SeriesNamer::new(mib, &config.query);
        let (control, commands) = control::channel(config.debug);
        Ok(Self {
            config,
            source,
            sender,
            namer,
            stats: Arc::new(TargetStats::new()),
            control,
            commands,
        })
    }

    pub fn stats_key(&self) -> String {
        self.config.stats_key()
    }

    /// Shared stats, for the registry.
    pub fn stats(&self) -> Arc<TargetStats> {
        self.stats.clone()
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll on every tick until `max_cycles` is reached.
    ///
    /// The first cycle starts immediately. Control commands are applied
    /// between cycles.
    pub async fn run(mut self) -> TargetStatsSnapshot {
        let key = self.stats_key();
        tracing::info!(
            "Polling {} every {}s",
            key,
            self.config.frequency.as_secs_f64()
        );

        if self.commands.debug_enabled() {
            self.source.set_debug(&self.config.device, true);
        }

        let mut ticker = tokio::time::interval(self.config.frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are recorded in the stats and logged by poll_once.
                    let _ = self.poll_once().await;
                    cycles += 1;
                    if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                        break;
                    }
                }
                Some(command) = self.commands.recv() => {
                    let enabled = self.commands.apply(command);
                    self.source.set_debug(&self.config.device, enabled);
                    tracing::info!("Debug for {} {}", key, if enabled { "on" } else { "off" });
                }
            }
        }

        tracing::info!("Poller {} stopped after {} cycles", key, cycles);
        self.stats.snapshot()
    }

    /// Run one cycle and return the number of points submitted.
    ///
    /// A failed poll is recorded in the stats, followed by a reconnect.
    pub async fn poll_once(&self) -> Result<usize, PduError> {
        let replies = match self
            .source
            .poll(&self.config.device, &self.config.query)
            .await
        {
            Ok(replies) => replies,
            Err(err) => {
                self.stats.record_error(&err, Utc::now());
                tracing::warn!("Poll of {} failed: {}", self.stats_key(), err);
                self.reconnect().await;
                return Err(err);
            }
        };
        self.stats.record_get();

        let debug = self.commands.debug_enabled();
        let mut submitted = 0;
        for reply in &replies {
            let Some((series, tags, fields)) = self.convert(reply) else {
                continue;
            };
            if debug {
                tracing::info!("{} {} {:?} {:?}", self.stats_key(), series, tags, fields);
            }
            match self
                .sender
                .submit(series, tags, fields, reply.requested_at)
                .await
            {
                Ok(()) => submitted += 1,
                Err(SenderError::Point(err)) => {
                    tracing::warn!("Dropping value {} from {}: {}", reply.name, self.stats_key(), err);
                }
                Err(err) => {
                    tracing::warn!("Cannot submit points from {}: {}", self.stats_key(), err);
                    break;
                }
            }
        }

        tracing::debug!(
            "{}: {} replies, {} points",
            self.stats_key(),
            replies.len(),
            submitted
        );
        Ok(submitted)
    }

    /// Name, normalize and tag one reply. `None` drops it.
    fn convert(&self, reply: &Reply) -> Option<(String, Tags, Fields)> {
        let name = self.namer.resolve(&reply.name)?;
        let value = self.config.query.normalize.apply(&reply.value)?;

        let mut tags = reply.tags.clone();
        tags.extend(
            self.config
                .static_tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        tags.insert("host".into(), self.config.device.host.clone());
        tags.insert("query".into(), self.config.query.name.clone());
        if let Some(column) = &name.column {
            tags.insert("column".into(), column.clone());
        }

        let mut fields = Fields::new();
        fields.insert("value".into(), value);
        if self.config.query.elapsed {
            if let Some(elapsed) = reply.elapsed() {
                fields.insert(
                    "elapsed_ms".into(),
                    FieldValue::Float(elapsed.as_secs_f64() * 1000.0),
                );
            }
        }

        Some((name.series_id(), tags, fields))
    }

    /// Rebuild the client, retrying every device timeout until it works.
    async fn reconnect(&self) {
        let device = &self.config.device;
        loop {
            match self.source.reconnect(device).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!("Reconnect to {} failed: {}", device.host, err);
                    tokio::time::sleep(device.timeout).await;
                }
            }
        }
    }
}
