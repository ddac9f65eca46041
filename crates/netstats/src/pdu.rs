// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PDU source abstraction
//!
//! The collector never parses protocol bytes. Issuing requests against a
//! device and decoding the replies is the job of a [`PduSource`], which the
//! embedding application implements on top of its SNMP client.
//!
//! # Integration
//!
//! ```ignore
//! impl PduSource for SnmpClientPool {
//!     async fn poll(&self, device: &DeviceProfile, query: &QueryDefinition)
//!         -> Result<Vec<Reply>, PduError>
//!     {
//!         // GET query.oids in chunks, one Reply per varbind...
//!     }
//! }
//! ```

use crate::normalize::NormalizeConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a PDU source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PduError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// SNMP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnmpVersion {
    #[serde(rename = "1")]
    V1,
    #[default]
    #[serde(rename = "2c")]
    V2c,
    #[serde(rename = "3")]
    V3,
}

/// How to reach one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceProfile {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub community: String,
    pub version: SnmpVersion,
    pub retries: u32,
    pub timeout: Duration,
}

/// What to ask a device for on every cycle.
#[derive(Debug, Clone)]
pub struct QueryDefinition {
    /// Query name, part of the stats key and the `query` tag.
    pub name: String,
    /// Object identifiers to request.
    pub oids: Vec<String>,
    /// Object names whose values are kept (the interest set).
    pub objects: HashSet<String>,
    /// Whether the objects are scalars (`.0` instances).
    pub scalars: bool,
    /// Optional filter the column label must match.
    pub index_filter: Option<Regex>,
    /// Index suffix to column label overrides.
    pub aliases: HashMap<String, String>,
    /// Add an `elapsed_ms` field computed from request/reply times.
    pub elapsed: bool,
    /// Numeric normalization applied to every value.
    pub normalize: NormalizeConfig,
}

/// A raw value as decoded by the protocol client.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Counter32(u32),
    Counter64(u64),
    Gauge32(u32),
    TimeTicks(u32),
    Unsigned(u64),
    Float(f64),
    Boolean(bool),
    OctetString(Vec<u8>),
    ObjectIdentifier(String),
    IpAddress([u8; 4]),
    Null,
}

/// One named value returned by a poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Object identifier (or name) of the value, optionally with a leading dot.
    pub name: String,
    /// Extra tags supplied by the source.
    pub tags: BTreeMap<String, String>,
    pub value: RawValue,
    /// When the request carrying this value was sent.
    pub requested_at: DateTime<Utc>,
    /// When the reply was received.
    pub received_at: DateTime<Utc>,
}

impl Reply {
    /// Reply with no extra tags where request and reply share a timestamp.
    pub fn new(name: impl Into<String>, value: RawValue, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            value,
            requested_at: at,
            received_at: at,
        }
    }

    /// Round-trip time of the request, if the clock did not go backwards.
    pub fn elapsed(&self) -> Option<Duration> {
        (self.received_at - self.requested_at).to_std().ok()
    }
}

/// PDU source contract.
///
/// `poll` returns every value of one cycle or fails as a whole.
pub trait PduSource: Send + Sync + 'static {
    /// Run one query against one device.
    fn poll(
        &self,
        device: &DeviceProfile,
        query: &QueryDefinition,
    ) -> impl Future<Output = Result<Vec<Reply>, PduError>> + Send;

    /// Rebuild the client for `device` after a failed cycle.
    fn reconnect(
        &self,
        _device: &DeviceProfile,
    ) -> impl Future<Output = Result<(), PduError>> + Send {
        async { Ok(()) }
    }

    /// Turn protocol-level debug output for `device` on or off.
    fn set_debug(&self, _device: &DeviceProfile, _enabled: bool) {}
}

impl<T: PduSource> PduSource for Arc<T> {
    fn poll(
        &self,
        device: &DeviceProfile,
        query: &QueryDefinition,
    ) -> impl Future<Output = Result<Vec<Reply>, PduError>> + Send {
        (**self).poll(device, query)
    }

    fn reconnect(
        &self,
        device: &DeviceProfile,
    ) -> impl Future<Output = Result<(), PduError>> + Send {
        (**self).reconnect(device)
    }

    fn set_debug(&self, device: &DeviceProfile, enabled: bool) {
        (**self).set_debug(device, enabled)
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Scripted outcome of one poll.
#[derive(Debug, Clone)]
pub enum MockPoll {
    Replies(Vec<(String, RawValue)>),
    Fail(PduError),
}

#[derive(Debug, Default)]
struct MockPduState {
    script: HashMap<String, VecDeque<MockPoll>>,
    fallback: HashMap<String, Vec<(String, RawValue)>>,
    polls: HashMap<String, usize>,
    reconnects: HashMap<String, usize>,
    debug: HashMap<String, bool>,
}

/// PDU source returning scripted replies per host.
///
/// Scripted outcomes are consumed in order; once a host's script is empty the
/// host's steady-state replies (if any) are returned on every poll.
#[derive(Debug, Default)]
pub struct MockPduSource {
    state: Mutex<MockPduState>,
}

impl MockPduSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one outcome for `host`.
    pub fn push(&self, host: &str, outcome: MockPoll) {
        self.state
            .lock()
            .script
            .entry(host.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Replies returned for `host` whenever its script is empty.
    pub fn set_replies(&self, host: &str, replies: Vec<(String, RawValue)>) {
        self.state.lock().fallback.insert(host.to_string(), replies);
    }

    /// Number of polls issued against `host`.
    pub fn polls(&self, host: &str) -> usize {
        self.state.lock().polls.get(host).copied().unwrap_or(0)
    }

    /// Number of reconnects requested for `host`.
    pub fn reconnects(&self, host: &str) -> usize {
        self.state.lock().reconnects.get(host).copied().unwrap_or(0)
    }

    /// Last debug flag set for `host`.
    pub fn debug_enabled(&self, host: &str) -> bool {
        self.state.lock().debug.get(host).copied().unwrap_or(false)
    }
}

impl PduSource for MockPduSource {
    async fn poll(
        &self,
        device: &DeviceProfile,
        _query: &QueryDefinition,
    ) -> Result<Vec<Reply>, PduError> {
        let now = Utc::now();
        let outcome = {
            let mut state = self.state.lock();
            *state.polls.entry(device.host.clone()).or_default() += 1;
            let scripted = state.script.get_mut(&device.host).and_then(|q| q.pop_front());
            match scripted {
                Some(outcome) => outcome,
                None => MockPoll::Replies(
                    state.fallback.get(&device.host).cloned().unwrap_or_default(),
                ),
            }
        };

        match outcome {
            MockPoll::Replies(values) => Ok(values
                .into_iter()
                .map(|(name, value)| Reply::new(name, value, now))
                .collect()),
            MockPoll::Fail(err) => Err(err),
        }
    }

    async fn reconnect(&self, device: &DeviceProfile) -> Result<(), PduError> {
        *self
            .state
            .lock()
            .reconnects
            .entry(device.host.clone())
            .or_default() += 1;
        Ok(())
    }

    fn set_debug(&self, device: &DeviceProfile, enabled: bool) {
        self.state.lock().debug.insert(device.host.clone(), enabled);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn device(host: &str) -> DeviceProfile {
        DeviceProfile {
            host: host.to_string(),
            port: 161,
            community: "public".to_string(),
            version: SnmpVersion::V2c,
            retries: 1,
            timeout: Duration::from_secs(5),
        }
    }

    pub(crate) fn query(name: &str, objects: &[&str]) -> QueryDefinition {
        QueryDefinition {
            name: name.to_string(),
            oids: Vec::new(),
            objects: objects.iter().map(|s| s.to_string()).collect(),
            scalars: false,
            index_filter: None,
            aliases: HashMap::new(),
            elapsed: false,
            normalize: NormalizeConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_mock_source_script_then_fallback() {
        let source = MockPduSource::new();
        source.push("sw1", MockPoll::Fail(PduError::Timeout));
        source.set_replies("sw1", vec![("1.3.6.1.2.1.1.3.0".into(), RawValue::TimeTicks(42))]);

        let dev = device("sw1");
        let q = query("system", &["sysUpTime"]);

        assert_eq!(source.poll(&dev, &q).await, Err(PduError::Timeout));
        let replies = source.poll(&dev, &q).await.expect("replies");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].value, RawValue::TimeTicks(42));
        assert_eq!(source.polls("sw1"), 2);
    }

    #[test]
    fn test_reply_elapsed() {
        let start = Utc::now();
        let mut reply = Reply::new("1.3", RawValue::Null, start);
        reply.received_at = start + chrono::Duration::milliseconds(12);
        assert_eq!(reply.elapsed(), Some(Duration::from_millis(12)));
    }
}
