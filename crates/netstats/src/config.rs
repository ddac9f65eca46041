// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collector configuration.
//!
//! Query and sender references are looked up by name, falling back to the
//! `"*"` entry. A target without explicit references uses its own name.

use crate::mib::{trim_oid, MibTable};
use crate::normalize::NormalizeConfig;
use crate::pdu::{DeviceProfile, QueryDefinition, SnmpVersion};
use crate::poller::PollerConfig;
use netstats_sink::SenderConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the catch-all query/sender entry.
pub const WILDCARD: &str = "*";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown MIB object: {0}")]
    UnknownObject(String),

    #[error("Invalid index filter for query '{query}': {source}")]
    IndexFilter {
        query: String,
        #[source]
        source: regex::Error,
    },
}

/// Whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    #[serde(default)]
    pub queries: BTreeMap<String, QueryConfig>,

    #[serde(default)]
    pub senders: BTreeMap<String, SenderConfig>,
}

/// Values used when a target does not set its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Poll frequency (seconds).
    #[serde(default = "default_frequency")]
    pub frequency_secs: u64,

    /// Stop every poller after this many cycles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            frequency_secs: default_frequency(),
            max_cycles: None,
        }
    }
}

/// One group of devices sharing credentials and queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub hosts: Vec<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_community")]
    pub community: String,

    #[serde(default)]
    pub version: SnmpVersion,

    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-request timeout (seconds), also the reconnect retry interval.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Overrides `defaults.frequency_secs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_secs: Option<u64>,

    /// Query names; empty means the target's own name.
    #[serde(default)]
    pub queries: Vec<String>,

    /// Sender name; unset means the target's own name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Static tags added to every point.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Index to column label overrides.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    #[serde(default)]
    pub debug: bool,
}

impl TargetConfig {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            port: default_port(),
            community: default_community(),
            version: SnmpVersion::default(),
            retries: default_retries(),
            timeout_secs: default_timeout(),
            frequency_secs: None,
            queries: Vec::new(),
            sender: None,
            tags: BTreeMap::new(),
            aliases: BTreeMap::new(),
            debug: false,
        }
    }
}

/// A set of objects polled together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    /// MIB object names or numeric OIDs.
    pub objects: Vec<String>,

    /// Objects are scalars (`.0` instance).
    #[serde(default)]
    pub scalars: bool,

    /// Regex the column label must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_filter: Option<String>,

    /// Add an `elapsed_ms` field.
    #[serde(default)]
    pub elapsed: bool,

    #[serde(default)]
    pub normalize: NormalizeConfig,
}

fn default_frequency() -> u64 {
    30
}

fn default_port() -> u16 {
    161
}

fn default_community() -> String {
    "public".to_string()
}

fn default_retries() -> u32 {
    1
}

fn default_timeout() -> u64 {
    5
}

/// One poller to start, with the sender it feeds.
#[derive(Debug, Clone)]
pub struct PlannedPoller {
    /// Key into [`AppConfig::senders`].
    pub sender: String,
    pub poller: PollerConfig,
}

impl AppConfig {
    /// Load and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("No targets configured".into()));
        }
        if self.defaults.frequency_secs == 0 {
            return Err(ConfigError::Invalid(
                "defaults.frequency_secs must be positive".into(),
            ));
        }

        for (name, query) in &self.queries {
            if query.objects.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Query '{}' has no objects",
                    name
                )));
            }
            compile_filter(name, query)?;
        }

        for (name, sender) in &self.senders {
            if sender.url.is_empty() || sender.database.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Sender '{}' needs a url and a database",
                    name
                )));
            }
        }

        let mut keys = HashSet::new();
        for (name, target) in &self.targets {
            if target.hosts.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' has no hosts",
                    name
                )));
            }
            if target.frequency_secs == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' has a zero poll frequency",
                    name
                )));
            }
            if target.timeout_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' has a zero timeout",
                    name
                )));
            }
            if let Some((key, _)) = target
                .tags
                .iter()
                .find(|(k, v)| k.is_empty() || v.is_empty())
            {
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' has an empty tag '{}'",
                    name, key
                )));
            }

            let sender = self.sender_ref(name, target);
            if self.lookup_sender(sender).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' references unknown sender '{}'",
                    name, sender
                )));
            }

            for query in self.query_refs(name, target) {
                if self.lookup_query(query).is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "Target '{}' references unknown query '{}'",
                        name, query
                    )));
                }
                for host in &target.hosts {
                    let key = format!("{}/{}", host, query);
                    if !keys.insert(key.clone()) {
                        return Err(ConfigError::Invalid(format!(
                            "Duplicate poll of '{}' (target '{}')",
                            key, name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Query config for `name`, or the `"*"` entry.
    pub fn lookup_query(&self, name: &str) -> Option<&QueryConfig> {
        self.queries
            .get(name)
            .or_else(|| self.queries.get(WILDCARD))
    }

    /// Sender config for `name`, or the `"*"` entry.
    pub fn lookup_sender(&self, name: &str) -> Option<&SenderConfig> {
        self.senders
            .get(name)
            .or_else(|| self.senders.get(WILDCARD))
    }

    /// Key of the sender entry `name` resolves to.
    pub fn sender_key<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.senders.contains_key(name) {
            Some(name)
        } else if self.senders.contains_key(WILDCARD) {
            Some(WILDCARD)
        } else {
            None
        }
    }

    fn query_refs<'a>(&'a self, name: &'a str, target: &'a TargetConfig) -> Vec<&'a str> {
        if target.queries.is_empty() {
            vec![name]
        } else {
            target.queries.iter().map(String::as_str).collect()
        }
    }

    fn sender_ref<'a>(&self, name: &'a str, target: &'a TargetConfig) -> &'a str {
        target.sender.as_deref().unwrap_or(name)
    }

    /// Resolve every (host, query) pair against the MIB.
    ///
    /// Fails on object names the MIB does not know.
    pub fn plan(&self, mib: &MibTable) -> Result<Vec<PlannedPoller>, ConfigError> {
        self.validate()?;

        let mut planned = Vec::new();
        for (name, target) in &self.targets {
            let sender_ref = self.sender_ref(name, target);
            let sender = self
                .sender_key(sender_ref)
                .ok_or_else(|| ConfigError::Invalid(format!("Unknown sender '{}'", sender_ref)))?
                .to_string();
            let frequency = Duration::from_secs(
                target
                    .frequency_secs
                    .unwrap_or(self.defaults.frequency_secs),
            );

            for query_ref in self.query_refs(name, target) {
                let query_config = self
                    .lookup_query(query_ref)
                    .ok_or_else(|| ConfigError::Invalid(format!("Unknown query '{}'", query_ref)))?;
                let query = build_query(query_ref, query_config, target, mib)?;

                for host in &target.hosts {
                    let device = DeviceProfile {
                        host: host.clone(),
                        port: target.port,
                        community: target.community.clone(),
                        version: target.version,
                        retries: target.retries,
                        timeout: Duration::from_secs(target.timeout_secs),
                    };
                    let mut poller = PollerConfig::new(device, query.clone(), frequency);
                    poller.static_tags = target.tags.clone();
                    poller.max_cycles = self.defaults.max_cycles;
                    poller.debug = target.debug;

                    planned.push(PlannedPoller {
                        sender: sender.clone(),
                        poller,
                    });
                }
            }
        }

        Ok(planned)
    }

    /// Example document written by `netstats gen-config`.
    pub fn example() -> Self {
        let mut config = Self::default();

        config.queries.insert(
            "traffic".into(),
            QueryConfig {
                objects: vec!["ifHCInOctets".into(), "ifHCOutOctets".into()],
                index_filter: Some("^(uplink|downlink)$".into()),
                ..Default::default()
            },
        );
        config.queries.insert(
            WILDCARD.into(),
            QueryConfig {
                objects: vec!["sysUpTime".into()],
                scalars: true,
                elapsed: true,
                ..Default::default()
            },
        );

        config.senders.insert(
            WILDCARD.into(),
            SenderConfig::new("http://localhost:8086", "netstats").batch_size(1000),
        );

        let mut core = TargetConfig::new(["core-sw1", "core-sw2"]);
        core.queries = vec!["traffic".into(), "system".into()];
        core.frequency_secs = Some(10);
        core.tags.insert("site".into(), "dc1".into());
        core.aliases.insert("1".into(), "uplink".into());
        core.aliases.insert("2".into(), "downlink".into());
        config.targets.insert("core".into(), core);

        config
            .targets
            .insert("edge".into(), TargetConfig::new(["edge-rtr1"]));

        config
    }
}

fn compile_filter(name: &str, query: &QueryConfig) -> Result<Option<Regex>, ConfigError> {
    query
        .index_filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|source| ConfigError::IndexFilter {
            query: name.to_string(),
            source,
        })
}

fn build_query(
    name: &str,
    config: &QueryConfig,
    target: &TargetConfig,
    mib: &MibTable,
) -> Result<QueryDefinition, ConfigError> {
    let oids = config
        .objects
        .iter()
        .map(|object| mib.resolve(object, config.scalars))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryDefinition {
        name: name.to_string(),
        oids,
        objects: config
            .objects
            .iter()
            .map(|o| trim_oid(o).to_string())
            .collect(),
        scalars: config.scalars,
        index_filter: compile_filter(name, config)?,
        aliases: target
            .aliases
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        elapsed: config.elapsed,
        normalize: config.normalize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SeriesNamer;
    use crate::normalize::Overflow;
    use std::sync::Arc;

    const DOC: &str = r#"
[defaults]
frequency_secs = 60

[targets.core]
hosts = ["sw1", "sw2"]
community = "s3cret"
version = "1"
queries = ["traffic"]
sender = "main"
frequency_secs = 15
tags = { site = "dc1" }
aliases = { "1" = "uplink" }

[targets.edge]
hosts = ["rtr1"]

[queries.traffic]
objects = ["ifHCInOctets"]
index_filter = "^uplink$"
normalize = { overflow = "drop" }

[queries."*"]
objects = ["sysUpTime"]
scalars = true

[senders.main]
url = "http://influx:8086"
database = "net"

[senders."*"]
url = "http://localhost:8086"
database = "netstats"
batch_size = 100
"#;

    fn mib() -> MibTable {
        MibTable::parse(
            "ifHCInOctets 1.3.6.1.2.1.31.1.1.1.6\n\
             sysUpTime 1.3.6.1.2.1.1.3\n",
        )
    }

    #[test]
    fn test_parse_with_defaults() {
        let config = AppConfig::from_toml_str(DOC).expect("parse");
        let edge = &config.targets["edge"];
        assert_eq!(edge.port, 161);
        assert_eq!(edge.community, "public");
        assert_eq!(edge.version, SnmpVersion::V2c);
        assert_eq!(edge.retries, 1);
        assert_eq!(edge.timeout_secs, 5);
        assert_eq!(config.targets["core"].version, SnmpVersion::V1);
        assert_eq!(config.defaults.frequency_secs, 60);
    }

    #[test]
    fn test_wildcard_fallback() {
        let config = AppConfig::from_toml_str(DOC).expect("parse");
        assert_eq!(config.sender_key("edge"), Some("*"));
        assert_eq!(config.sender_key("main"), Some("main"));
        assert_eq!(
            config.lookup_query("edge").map(|q| q.objects.clone()),
            Some(vec!["sysUpTime".to_string()])
        );
    }

    #[test]
    fn test_plan() {
        let config = AppConfig::from_toml_str(DOC).expect("parse");
        let plan = config.plan(&mib()).expect("plan");
        assert_eq!(plan.len(), 3);

        let sw1 = plan
            .iter()
            .find(|p| p.poller.stats_key() == "sw1/traffic")
            .expect("sw1");
        assert_eq!(sw1.sender, "main");
        assert_eq!(sw1.poller.frequency, Duration::from_secs(15));
        assert_eq!(sw1.poller.device.community, "s3cret");
        assert_eq!(sw1.poller.static_tags["site"], "dc1");
        assert_eq!(sw1.poller.query.oids, vec!["1.3.6.1.2.1.31.1.1.1.6"]);
        assert_eq!(sw1.poller.query.aliases["1"], "uplink");
        assert_eq!(sw1.poller.query.normalize.overflow, Overflow::Drop);
        assert!(sw1.poller.query.index_filter.is_some());

        let rtr1 = plan
            .iter()
            .find(|p| p.poller.stats_key() == "rtr1/edge")
            .expect("rtr1");
        assert_eq!(rtr1.sender, "*");
        assert_eq!(rtr1.poller.frequency, Duration::from_secs(60));
        assert_eq!(rtr1.poller.query.oids, vec!["1.3.6.1.2.1.1.3.0"]);
    }

    #[test]
    fn test_plan_unknown_object() {
        let config = AppConfig::from_toml_str(DOC).expect("parse");
        let err = config.plan(&MibTable::new()).expect_err("unknown object");
        assert!(matches!(err, ConfigError::UnknownObject(_)));
    }

    #[test]
    fn test_validation_errors() {
        assert!(AppConfig::from_toml_str("").is_err());

        let no_hosts = "[targets.a]\nhosts = []\n[queries.\"*\"]\nobjects = [\"x\"]\n\
                        [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        assert!(AppConfig::from_toml_str(no_hosts).is_err());

        let no_sender = "[targets.a]\nhosts = [\"h\"]\n[queries.\"*\"]\nobjects = [\"x\"]\n";
        assert!(AppConfig::from_toml_str(no_sender).is_err());

        let no_query = "[targets.a]\nhosts = [\"h\"]\n\
                        [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        assert!(AppConfig::from_toml_str(no_query).is_err());

        let zero_freq = "[targets.a]\nhosts = [\"h\"]\nfrequency_secs = 0\n\
                         [queries.\"*\"]\nobjects = [\"x\"]\n\
                         [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        assert!(AppConfig::from_toml_str(zero_freq).is_err());

        let bad_regex = "[targets.a]\nhosts = [\"h\"]\n\
                         [queries.\"*\"]\nobjects = [\"x\"]\nindex_filter = \"(\"\n\
                         [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        assert!(matches!(
            AppConfig::from_toml_str(bad_regex),
            Err(ConfigError::IndexFilter { .. })
        ));

        let empty_tag = "[targets.a]\nhosts = [\"h\"]\ntags = { site = \"\" }\n\
                         [queries.\"*\"]\nobjects = [\"x\"]\n\
                         [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        let err = AppConfig::from_toml_str(empty_tag).expect_err("empty tag");
        assert!(err.to_string().contains("site"));
    }

    #[test]
    fn test_duplicate_host_query_rejected() {
        let doc = "[targets.a]\nhosts = [\"h\"]\nqueries = [\"q\"]\n\
                   [targets.b]\nhosts = [\"h\"]\nqueries = [\"q\"]\n\
                   [queries.q]\nobjects = [\"x\"]\n\
                   [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        let err = AppConfig::from_toml_str(doc).expect_err("duplicate");
        assert!(err.to_string().contains("h/q"));
    }

    #[test]
    fn test_example_round_trip() {
        let example = AppConfig::example();
        example.validate().expect("valid example");

        let text = example.to_toml_string().expect("serialize");
        let parsed = AppConfig::from_toml_str(&text).expect("parse");
        assert_eq!(parsed.targets.len(), 2);
        assert_eq!(parsed.targets["core"].queries, vec!["traffic", "system"]);
    }

    #[test]
    fn test_example_names_aliased_columns() {
        let mib = Arc::new(MibTable::parse(
            "ifHCInOctets 1.3.6.1.2.1.31.1.1.1.6\n\
             ifHCOutOctets 1.3.6.1.2.1.31.1.1.1.10\n\
             sysUpTime 1.3.6.1.2.1.1.3\n",
        ));
        let plan = AppConfig::example().plan(&mib).expect("plan");
        let traffic = plan
            .iter()
            .find(|p| p.poller.stats_key() == "core-sw1/traffic")
            .expect("core-sw1/traffic");

        let namer = SeriesNamer::new(mib.clone(), &traffic.poller.query);
        assert_eq!(
            namer
                .resolve("1.3.6.1.2.1.31.1.1.1.6.1")
                .map(|n| n.series_id()),
            Some("ifHCInOctets.uplink".to_string())
        );
        assert_eq!(
            namer
                .resolve("1.3.6.1.2.1.31.1.1.1.10.2")
                .map(|n| n.series_id()),
            Some("ifHCOutOctets.downlink".to_string())
        );
        assert!(namer.resolve("1.3.6.1.2.1.31.1.1.1.6.3").is_none());
    }

    #[test]
    fn test_numeric_objects_resolve_to_named_series() {
        let doc = "[targets.a]\nhosts = [\"h\"]\n\
                   [queries.\"*\"]\nobjects = [\".1.3.6.1.2.1.31.1.1.1.6\"]\n\
                   [senders.\"*\"]\nurl = \"u\"\ndatabase = \"d\"\n";
        let mib = Arc::new(mib());
        let plan = AppConfig::from_toml_str(doc)
            .expect("parse")
            .plan(&mib)
            .expect("plan");
        assert_eq!(plan[0].poller.query.oids, vec!["1.3.6.1.2.1.31.1.1.1.6"]);

        let namer = SeriesNamer::new(mib, &plan[0].poller.query);
        assert_eq!(
            namer
                .resolve("1.3.6.1.2.1.31.1.1.1.6.1")
                .map(|n| n.series_id()),
            Some("ifHCInOctets.1".to_string())
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("netstats.toml");
        std::fs::write(&path, DOC).expect("write");
        let config = AppConfig::from_file(&path).expect("load");
        assert_eq!(config.targets.len(), 2);

        assert!(matches!(
            AppConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
