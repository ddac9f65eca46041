// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::too_many_lines)] // Scenario tests

//! End-to-end collector tests
//!
//! Pollers run against a scripted PDU source and deliver through a real
//! sender into an in-memory store, on tokio's paused clock.

use netstats::{
    AppConfig, Collector, DeviceProfile, MibTable, MockPduSource, MockPoll, NormalizeConfig,
    PduError, PollerConfig, QueryDefinition, RawValue, SnmpVersion, TargetPoller,
};
use netstats_sink::{FieldValue, MockStore, Sender, SenderConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const IF_IN: &str = "1.3.6.1.2.1.31.1.1.1.6";
const IF_OUT: &str = "1.3.6.1.2.1.31.1.1.1.10";
const SYS_UPTIME: &str = "1.3.6.1.2.1.1.3";

const CONFIG: &str = r#"
[defaults]
frequency_secs = 10
max_cycles = 3

[targets.core]
hosts = ["sw1", "sw2"]
queries = ["traffic"]
tags = { site = "dc1" }
aliases = { "1" = "uplink", "2" = "downlink" }

[targets.edge]
hosts = ["rtr1"]

[queries.traffic]
objects = ["ifHCInOctets", "ifHCOutOctets"]

[queries."*"]
objects = ["sysUpTime"]
scalars = true

[senders."*"]
url = "http://influx:8086"
database = "netstats"
batch_size = 4
flush_interval_secs = 1
"#;

fn mib() -> Arc<MibTable> {
    Arc::new(MibTable::parse(&format!(
        "ifHCInOctets {}\nifHCOutOctets {}\nsysUpTime {}\n",
        IF_IN, IF_OUT, SYS_UPTIME
    )))
}

fn interface_replies() -> Vec<(String, RawValue)> {
    vec![
        (format!("{}.1", IF_IN), RawValue::Counter64(1_000)),
        (format!("{}.2", IF_IN), RawValue::Counter64(2_000)),
        // No alias for index 3: dropped.
        (format!("{}.3", IF_IN), RawValue::Counter64(3_000)),
        (format!("{}.1", IF_OUT), RawValue::Counter64(u64::MAX)),
        (format!("{}.2", IF_OUT), RawValue::Counter64(4_000)),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_collector_delivers_everything_across_store_failures() {
    let config = AppConfig::from_toml_str(CONFIG).expect("config");

    let source = Arc::new(MockPduSource::new());
    source.set_replies("sw1", interface_replies());
    source.set_replies("sw2", interface_replies());
    source.push("rtr1", MockPoll::Fail(PduError::Timeout));
    source.set_replies(
        "rtr1",
        vec![(format!("{}.0", SYS_UPTIME), RawValue::TimeTicks(4242))],
    );

    let store = Arc::new(MockStore::new(["netstats"]));
    store.fail_next_writes(2);
    let factory_store = store.clone();

    let collector = Collector::start(
        &config,
        mib(),
        move |_, _| factory_store.clone(),
        source.clone(),
    )
    .await
    .expect("start");

    let finished = collector.wait().await;
    assert_eq!(finished.len(), 3);
    assert_eq!(finished["sw1/traffic"].gets, 3);
    assert_eq!(finished["rtr1/edge"].requests, 3);
    assert_eq!(finished["rtr1/edge"].errors, 1);
    assert_eq!(source.reconnects("rtr1"), 1);

    // 2 core hosts x 3 cycles x 4 aliased values, plus 2 successful edge cycles.
    let expected = 2 * 3 * 4 + 2;
    store.wait_for_points(expected).await;
    assert_eq!(store.points_written(), expected);

    let attempts = store.attempts();
    assert!(!attempts[0].succeeded);
    assert!(!attempts[1].succeeded);
    assert!(attempts[2].succeeded);
    assert_eq!(attempts[0].batch, attempts[2].batch);
    assert!(attempts[1].at - attempts[0].at >= Duration::from_secs(30));

    let mut per_series: HashMap<String, usize> = HashMap::new();
    for batch in store.written() {
        for point in batch.points() {
            *per_series
                .entry(format!("{}@{}", point.series(), point.tags()["host"]))
                .or_default() += 1;
        }
    }
    assert_eq!(per_series["ifHCInOctets.uplink@sw1"], 3);
    assert_eq!(per_series["ifHCOutOctets.downlink@sw2"], 3);
    assert_eq!(per_series["sysUpTime@rtr1"], 2);
    assert!(!per_series.keys().any(|k| k.starts_with("ifHCInOctets.3")));

    let overflowed = store
        .written()
        .iter()
        .flat_map(|b| b.points().to_vec())
        .find(|p| p.series() == "ifHCOutOctets.uplink")
        .expect("overflowed counter");
    assert_eq!(
        overflowed.fields()["value"],
        FieldValue::Float(u64::MAX as f64)
    );
    assert_eq!(overflowed.tags()["site"], "dc1");
    assert_eq!(overflowed.tags()["column"], "uplink");
    assert_eq!(overflowed.tags()["query"], "traffic");
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_stalls_poller_until_store_recovers() {
    let store = Arc::new(MockStore::new(["netstats"]));
    store.fail_all_writes();

    let sender_config = SenderConfig::new("http://influx:8086", "netstats")
        .batch_size(1)
        .queue_size(2)
        .flush_interval_secs(1);
    let sender = Sender::connect(sender_config, store.clone())
        .await
        .expect("connect");

    let source = MockPduSource::new();
    source.set_replies(
        "sw1",
        (1..=6)
            .map(|i| (format!("{}.{}", IF_IN, i), RawValue::Counter32(i)))
            .collect(),
    );

    let device = DeviceProfile {
        host: "sw1".into(),
        port: 161,
        community: "public".into(),
        version: SnmpVersion::V2c,
        retries: 1,
        timeout: Duration::from_secs(5),
    };
    let query = QueryDefinition {
        name: "traffic".into(),
        oids: vec![IF_IN.into()],
        objects: ["ifHCInOctets".to_string()].into_iter().collect(),
        scalars: false,
        index_filter: None,
        aliases: HashMap::new(),
        elapsed: false,
        normalize: NormalizeConfig::default(),
    };
    let poller = TargetPoller::new(
        PollerConfig::new(device, query, Duration::from_secs(60)),
        mib(),
        source,
        sender,
    )
    .expect("poller");

    let cycle = tokio::spawn(async move { poller.poll_once().await });

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(!cycle.is_finished());
    assert_eq!(store.points_written(), 0);

    store.recover();
    let submitted = cycle.await.expect("join").expect("poll");
    assert_eq!(submitted, 6);

    store.wait_for_points(6).await;
    let values: Vec<FieldValue> = store
        .written()
        .iter()
        .flat_map(|b| b.points().to_vec())
        .map(|p| p.fields()["value"].clone())
        .collect();
    let expected: Vec<FieldValue> = (1..=6).map(FieldValue::Integer).collect();
    assert_eq!(values, expected);

    let failed: Vec<_> = store
        .attempts()
        .into_iter()
        .filter(|a| !a.succeeded)
        .collect();
    assert!(failed.len() >= 2);
    assert!(failed.iter().all(|a| a.batch == failed[0].batch));
}
