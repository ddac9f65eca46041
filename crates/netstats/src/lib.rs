// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Netstats SNMP collector
//!
//! Polls network devices and turns every reply into time-series points
//! delivered through [`netstats_sink`].
//!
//! # Features
//!
//! - **Target Pollers**: one task per (host, query) pair, flaky devices never
//!   stop the loop
//! - **Series Naming**: MIB names, index columns and per-target aliases
//! - **Normalization**: configurable coercion of large counters
//! - **Stats Registry**: per-target request/get/error counters
//! - **Control**: per-target debug toggles
//!
//! # Quick Start
//!
//! ```bash
//! # Write an example configuration
//! netstats gen-config --output netstats.toml
//!
//! # Check a configuration against a MIB table
//! netstats validate --config netstats.toml --oids oids.txt
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! [defaults]
//! frequency_secs = 30
//!
//! [targets.core]
//! hosts = ["core-sw1", "core-sw2"]
//! queries = ["traffic"]
//! tags = { site = "dc1" }
//!
//! [queries.traffic]
//! objects = ["ifHCInOctets", "ifHCOutOctets"]
//!
//! [senders."*"]
//! url = "http://localhost:8086"
//! database = "netstats"
//! ```
//!
//! # Embedding
//!
//! The protocol client and the store client are supplied by the caller:
//!
//! ```ignore
//! let collector = Collector::start(&config, mib, |_, cfg| InfluxStore::new(cfg), snmp).await?;
//! let status = collector.status();
//! ```

pub mod collector;
pub mod config;
pub mod control;
pub mod mib;
pub mod naming;
pub mod normalize;
pub mod pdu;
pub mod poller;
pub mod registry;
pub mod stats;

pub use collector::{Collector, CollectorError, SenderStatus, StatusReport, TargetStatus};
pub use config::{AppConfig, ConfigError, QueryConfig, TargetConfig};
pub use control::{ControlCommand, ControlHandle};
pub use mib::MibTable;
pub use naming::{SeriesName, SeriesNamer};
pub use normalize::{NormalizeConfig, Overflow};
pub use pdu::{
    DeviceProfile, MockPduSource, MockPoll, PduError, PduSource, QueryDefinition, RawValue, Reply,
    SnmpVersion,
};
pub use poller::{PollerConfig, PollerError, TargetPoller};
pub use registry::{RegistryError, StatsRegistry};
pub use stats::{TargetStats, TargetStatsSnapshot};
