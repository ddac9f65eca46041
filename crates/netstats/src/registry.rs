// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory of stats accessors, one per poller.

use crate::stats::{TargetStats, TargetStatsSnapshot};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("stats key '{0}' is already registered")]
    Duplicate(String),
}

/// Zero-argument snapshot function.
pub type StatsAccessor = Arc<dyn Fn() -> TargetStatsSnapshot + Send + Sync>;

/// Entries are added at startup and never removed.
#[derive(Default)]
pub struct StatsRegistry {
    entries: Mutex<BTreeMap<String, StatsAccessor>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accessor under `name`.
    pub fn register<F>(&self, name: impl Into<String>, accessor: F) -> Result<(), RegistryError>
    where
        F: Fn() -> TargetStatsSnapshot + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.lock();
        if entries.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        let accessor: StatsAccessor = Arc::new(accessor);
        entries.insert(name, accessor);
        Ok(())
    }

    /// Register the snapshot of a shared [`TargetStats`].
    pub fn register_stats(
        &self,
        name: impl Into<String>,
        stats: Arc<TargetStats>,
    ) -> Result<(), RegistryError> {
        self.register(name, move || stats.snapshot())
    }

    /// Snapshot every entry.
    ///
    /// Accessors run after the directory lock is released.
    pub fn snapshot(&self) -> BTreeMap<String, TargetStatsSnapshot> {
        let entries: Vec<(String, StatsAccessor)> = self
            .entries
            .lock()
            .iter()
            .map(|(name, accessor)| (name.clone(), accessor.clone()))
            .collect();

        entries
            .into_iter()
            .map(|(name, accessor)| (name, accessor()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl std::fmt::Debug for StatsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsRegistry")
            .field("names", &self.names())
            .finish()
    }
}
