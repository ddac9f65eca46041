// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw protocol values to point fields.
//!
//! Stores reject (or text-encode) unsigned integers beyond the signed 64-bit
//! range, so large counters are coerced according to [`Overflow`].

use crate::pdu::RawValue;
use netstats_sink::FieldValue;
use serde::{Deserialize, Serialize};

/// What to do with a counter above the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Store the value as a float (loses precision, keeps magnitude).
    #[default]
    Float,
    /// Store the value modulo `limit + 1`.
    Wrap,
    /// Skip the value.
    Drop,
}

/// Numeric normalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Apply counter coercion at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Largest unsigned value stored as an integer.
    #[serde(default = "default_counter_limit")]
    pub counter_limit: u64,

    /// Handling of values above `counter_limit`.
    #[serde(default)]
    pub overflow: Overflow,
}

fn default_true() -> bool {
    true
}

fn default_counter_limit() -> u64 {
    i64::MAX as u64
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            counter_limit: default_counter_limit(),
            overflow: Overflow::Float,
        }
    }
}

impl NormalizeConfig {
    /// Convert one raw value. `None` means the value is skipped.
    pub fn apply(&self, value: &RawValue) -> Option<FieldValue> {
        match value {
            RawValue::Integer(v) => Some(FieldValue::Integer(*v)),
            RawValue::Counter32(v) | RawValue::Gauge32(v) | RawValue::TimeTicks(v) => {
                self.unsigned(u64::from(*v))
            }
            RawValue::Counter64(v) | RawValue::Unsigned(v) => self.unsigned(*v),
            RawValue::Float(v) if v.is_finite() => Some(FieldValue::Float(*v)),
            RawValue::Float(_) => None,
            RawValue::Boolean(v) => Some(FieldValue::Boolean(*v)),
            RawValue::OctetString(bytes) => Some(FieldValue::String(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
            RawValue::ObjectIdentifier(oid) => Some(FieldValue::String(oid.clone())),
            RawValue::IpAddress([a, b, c, d]) => {
                Some(FieldValue::String(format!("{}.{}.{}.{}", a, b, c, d)))
            }
            RawValue::Null => None,
        }
    }

    fn unsigned(&self, v: u64) -> Option<FieldValue> {
        if !self.enabled {
            return i64::try_from(v).ok().map(FieldValue::Integer);
        }

        let limit = self.counter_limit.min(i64::MAX as u64);
        if v <= limit {
            return Some(FieldValue::Integer(v as i64));
        }
        match self.overflow {
            Overflow::Float => Some(FieldValue::Float(v as f64)),
            Overflow::Wrap => Some(FieldValue::Integer((v % (limit + 1)) as i64)),
            Overflow::Drop => None,
        }
    }
}
