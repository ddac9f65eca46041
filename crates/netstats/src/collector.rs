// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Startup context.
//!
//! The [`Collector`] owns everything built at startup: one sender per
//! referenced sender entry, one poller per (host, query) pair, the stats
//! registry and the control handles. Nothing here is process-global.

use crate::config::{AppConfig, ConfigError};
use crate::control::ControlHandle;
use crate::mib::MibTable;
use crate::pdu::{DeviceProfile, PduSource};
use crate::poller::{PollerError, TargetPoller};
use crate::registry::{RegistryError, StatsRegistry};
use crate::stats::TargetStatsSnapshot;
use chrono::{DateTime, Utc};
use netstats_sink::{
    PointStore, Sender, SenderConfig, SenderError, SenderHandle, SenderStatsSnapshot, Tags,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Startup errors. Any of them aborts the start.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sender '{name}' failed to start: {source}")]
    Sender {
        name: String,
        #[source]
        source: SenderError,
    },

    #[error("Poller error: {0}")]
    Poller(#[from] PollerError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),
}

struct TargetEntry {
    device: DeviceProfile,
    query: String,
    frequency_secs: u64,
    tags: Tags,
    sender: String,
    control: ControlHandle,
}

/// Running collector.
pub struct Collector {
    started: DateTime<Utc>,
    started_at: Instant,
    registry: Arc<StatsRegistry>,
    senders: BTreeMap<String, SenderHandle>,
    targets: BTreeMap<String, TargetEntry>,
    tasks: Vec<(String, JoinHandle<TargetStatsSnapshot>)>,
}

impl Collector {
    /// Connect senders, then build, register and spawn every poller.
    ///
    /// `store_factory` is called once per sender entry in use.
    pub async fn start<S, F, P>(
        config: &AppConfig,
        mib: Arc<MibTable>,
        mut store_factory: F,
        source: P,
    ) -> Result<Self, CollectorError>
    where
        S: PointStore,
        F: FnMut(&str, &SenderConfig) -> S,
        P: PduSource + Clone,
    {
        let plan = config.plan(&mib)?;

        let mut senders = BTreeMap::new();
        for planned in &plan {
            if senders.contains_key(&planned.sender) {
                continue;
            }
            let sender_config = config
                .senders
                .get(&planned.sender)
                .cloned()
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("Unknown sender '{}'", planned.sender))
                })?;
            let store = store_factory(&planned.sender, &sender_config);
            let handle = Sender::connect(sender_config, store)
                .await
                .map_err(|source| CollectorError::Sender {
                    name: planned.sender.clone(),
                    source,
                })?;
            senders.insert(planned.sender.clone(), handle);
        }

        let registry = Arc::new(StatsRegistry::new());
        let mut pollers = Vec::with_capacity(plan.len());
        let mut targets = BTreeMap::new();
        for planned in plan {
            let Some(sender) = senders.get(&planned.sender) else {
                continue;
            };
            let poller = TargetPoller::new(
                planned.poller,
                mib.clone(),
                source.clone(),
                sender.clone(),
            )?;
            let key = poller.stats_key();
            registry.register_stats(key.clone(), poller.stats())?;

            let poller_config = poller.config();
            targets.insert(
                key.clone(),
                TargetEntry {
                    device: poller_config.device.clone(),
                    query: poller_config.query.name.clone(),
                    frequency_secs: poller_config.frequency.as_secs(),
                    tags: poller_config.static_tags.clone(),
                    sender: planned.sender,
                    control: poller.control(),
                },
            );
            pollers.push((key, poller));
        }

        let tasks = pollers
            .into_iter()
            .map(|(key, poller)| (key, tokio::spawn(poller.run())))
            .collect::<Vec<_>>();

        tracing::info!(
            "Collector started: {} pollers, {} senders",
            tasks.len(),
            senders.len()
        );

        Ok(Self {
            started: Utc::now(),
            started_at: Instant::now(),
            registry,
            senders,
            targets,
            tasks,
        })
    }

    pub fn registry(&self) -> Arc<StatsRegistry> {
        self.registry.clone()
    }

    pub fn sender(&self, name: &str) -> Option<&SenderHandle> {
        self.senders.get(name)
    }

    /// Control handle of the poller registered as `key` (`<host>/<query>`).
    pub fn control(&self, key: &str) -> Option<ControlHandle> {
        self.targets.get(key).map(|t| t.control.clone())
    }

    /// Flip the debug flag of one poller.
    pub fn toggle_debug(&self, key: &str) -> Result<(), CollectorError> {
        let control = self
            .control(key)
            .ok_or_else(|| CollectorError::UnknownTarget(key.to_string()))?;
        control.toggle_debug();
        Ok(())
    }

    /// Read-only view of configuration and statistics.
    pub fn status(&self) -> StatusReport {
        let stats = self.registry.snapshot();

        let targets = self
            .targets
            .iter()
            .map(|(key, entry)| {
                let status = TargetStatus {
                    device: entry.device.clone(),
                    query: entry.query.clone(),
                    frequency_secs: entry.frequency_secs,
                    tags: entry.tags.clone(),
                    sender: entry.sender.clone(),
                    debug: entry.control.debug_enabled(),
                    stats: stats.get(key).cloned().unwrap_or_default(),
                };
                (key.clone(), status)
            })
            .collect();

        let senders = self
            .senders
            .iter()
            .map(|(name, handle)| (name.clone(), SenderStatus::new(handle)))
            .collect();

        StatusReport {
            started: self.started,
            uptime_secs: self.started_at.elapsed().as_secs(),
            targets,
            senders,
        }
    }

    /// Wait for every poller to finish and return their final stats.
    ///
    /// Pollers only finish when `max_cycles` is set.
    pub async fn wait(self) -> BTreeMap<String, TargetStatsSnapshot> {
        let mut finished = BTreeMap::new();
        for (key, task) in self.tasks {
            match task.await {
                Ok(stats) => {
                    finished.insert(key, stats);
                }
                Err(e) => tracing::warn!("Poller {} ended abnormally: {}", key, e),
            }
        }
        finished
    }
}

/// Status of the whole collector.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub started: DateTime<Utc>,
    pub uptime_secs: u64,
    pub targets: BTreeMap<String, TargetStatus>,
    pub senders: BTreeMap<String, SenderStatus>,
}

impl StatusReport {
    /// JSON rendering for the presentation layer.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Status of one poller. The community string is never included.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub device: DeviceProfile,
    pub query: String,
    pub frequency_secs: u64,
    pub tags: Tags,
    pub sender: String,
    pub debug: bool,
    pub stats: TargetStatsSnapshot,
}

/// Status of one sender. Credentials are never included.
#[derive(Debug, Clone, Serialize)]
pub struct SenderStatus {
    pub url: String,
    pub database: String,
    pub retention_policy: String,
    pub batch_size: usize,
    pub queue_size: usize,
    pub flush_interval_secs: u64,
    pub stats: SenderStatsSnapshot,
}

impl SenderStatus {
    fn new(handle: &SenderHandle) -> Self {
        let config = handle.config();
        Self {
            url: config.url.clone(),
            database: config.database.clone(),
            retention_policy: config.retention_policy.clone(),
            batch_size: config.batch_size,
            queue_size: config.queue_size,
            flush_interval_secs: config.flush_interval_secs,
            stats: handle.stats(),
        }
    }
}
