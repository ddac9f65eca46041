// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Immutable samples and their Line Protocol rendering.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v1/write_protocols/line_protocol_reference/>

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Tag set of a point. Keys are unique and kept in canonical order.
pub type Tags = BTreeMap<String, String>;

/// Field set of a point.
pub type Fields = BTreeMap<String, FieldValue>;

/// A value that can be stored in a point field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl FieldValue {
    /// Format this value for Line Protocol.
    ///
    /// - Float: written as-is (e.g., `3.14`)
    /// - Integer: suffixed with `i` (e.g., `42i`)
    /// - String: quoted with double quotes, inner quotes escaped (e.g., `"hello"`)
    /// - Boolean: `true` or `false`
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::String(v) => {
                let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            }
            FieldValue::Boolean(v) => v.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line_protocol())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

/// Reasons a point cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointError {
    #[error("series name is empty")]
    EmptySeries,

    #[error("point for series '{0}' has no fields")]
    NoFields(String),

    #[error("point for series '{0}' has an empty tag key")]
    EmptyTagKey(String),

    #[error("tag '{key}' of series '{series}' has an empty value")]
    EmptyTagValue { series: String, key: String },

    #[error("point for series '{0}' has an empty field key")]
    EmptyFieldKey(String),

    #[error("point for series '{0}' has a line break in a name or tag")]
    LineBreak(String),

    #[error("field '{field}' of series '{series}' is not a finite number")]
    NonFiniteFloat { series: String, field: String },
}

/// A single sample: a named series, tags, fields and a timestamp.
///
/// Points are validated on construction and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    series: String,
    tags: Tags,
    fields: Fields,
    timestamp: DateTime<Utc>,
}

impl Point {
    /// Build a point, rejecting anything the store's wire format cannot carry.
    pub fn new(
        series: impl Into<String>,
        tags: Tags,
        fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let series = series.into();
        if series.is_empty() {
            return Err(PointError::EmptySeries);
        }
        if fields.is_empty() {
            return Err(PointError::NoFields(series));
        }
        if has_line_break(&series) {
            return Err(PointError::LineBreak(series));
        }
        for (key, value) in &tags {
            if key.is_empty() {
                return Err(PointError::EmptyTagKey(series));
            }
            if value.is_empty() {
                return Err(PointError::EmptyTagValue {
                    series,
                    key: key.clone(),
                });
            }
            if has_line_break(key) || has_line_break(value) {
                return Err(PointError::LineBreak(series));
            }
        }
        for (key, value) in &fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey(series));
            }
            if has_line_break(key) {
                return Err(PointError::LineBreak(series));
            }
            if let FieldValue::Float(v) = value {
                if !v.is_finite() {
                    return Err(PointError::NonFiniteFloat {
                        series,
                        field: key.clone(),
                    });
                }
            }
        }

        Ok(Self {
            series,
            tags,
            fields,
            timestamp,
        })
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Render this point as one Line Protocol line (no trailing newline).
    ///
    /// Tags come out sorted by key. Timestamps outside the nanosecond range
    /// (before 1677 or after 2262) are omitted and left to the store.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.series);

        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');

        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&value.to_line_protocol());
        }

        if let Some(ns) = self.timestamp.timestamp_nanos_opt() {
            line.push(' ');
            line.push_str(&ns.to_string());
        }

        line
    }
}

/// Escape a measurement name for the line protocol.
/// Spaces and commas must be escaped with backslash.
fn has_line_break(s: &str) -> bool {
    s.contains(|c: char| c == '\n' || c == '\r')
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escape tag keys, tag values and field keys.
/// Commas, equals signs, and spaces must be escaped.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_field_value_formats() {
        assert_eq!(FieldValue::Float(3.15).to_line_protocol(), "3.15");
        assert_eq!(FieldValue::Integer(42).to_line_protocol(), "42i");
        assert_eq!(FieldValue::Boolean(true).to_line_protocol(), "true");
        assert_eq!(FieldValue::Boolean(false).to_line_protocol(), "false");
        assert_eq!(
            FieldValue::String("say \"hi\"".to_string()).to_line_protocol(),
            "\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_point_line_protocol_sorted_tags() {
        let point = Point::new(
            "ifHCInOctets",
            tags(&[("host", "10.0.0.1"), ("column", "uplink")]),
            fields(&[("value", FieldValue::Integer(1234))]),
            ts(1),
        )
        .expect("valid point");

        assert_eq!(
            point.to_line_protocol(),
            "ifHCInOctets,column=uplink,host=10.0.0.1 value=1234i 1000000000"
        );
    }

    #[test]
    fn test_point_line_protocol_escapes() {
        let point = Point::new(
            "my measurement",
            tags(&[("tag key", "tag,value")]),
            fields(&[("field=key", FieldValue::String("hello \"world\"".into()))]),
            ts(3),
        )
        .expect("valid point");

        assert_eq!(
            point.to_line_protocol(),
            "my\\ measurement,tag\\ key=tag\\,value field\\=key=\"hello \\\"world\\\"\" 3000000000"
        );
    }

    #[test]
    fn test_point_rejects_empty_series() {
        let err = Point::new("", Tags::new(), fields(&[("value", 1i64.into())]), ts(0));
        assert_eq!(err.unwrap_err(), PointError::EmptySeries);
    }

    #[test]
    fn test_point_rejects_no_fields() {
        let err = Point::new("cpu", Tags::new(), Fields::new(), ts(0));
        assert_eq!(err.unwrap_err(), PointError::NoFields("cpu".into()));
    }

    #[test]
    fn test_point_rejects_empty_keys() {
        let err = Point::new(
            "cpu",
            tags(&[("", "x")]),
            fields(&[("value", 1i64.into())]),
            ts(0),
        );
        assert!(matches!(err, Err(PointError::EmptyTagKey(_))));

        let err = Point::new("cpu", Tags::new(), fields(&[("", 1i64.into())]), ts(0));
        assert!(matches!(err, Err(PointError::EmptyFieldKey(_))));
    }

    #[test]
    fn test_point_rejects_empty_tag_value() {
        let err = Point::new(
            "ifHCInOctets.uplink",
            tags(&[("host", "sw1"), ("site", "")]),
            fields(&[("value", 1i64.into())]),
            ts(0),
        );
        assert_eq!(
            err.unwrap_err(),
            PointError::EmptyTagValue {
                series: "ifHCInOctets.uplink".into(),
                key: "site".into(),
            }
        );
    }

    #[test]
    fn test_point_rejects_line_breaks() {
        let value = fields(&[("value", 1i64.into())]);

        let err = Point::new("cpu\nmem", Tags::new(), value.clone(), ts(0));
        assert!(matches!(err, Err(PointError::LineBreak(_))));

        let err = Point::new("cpu", tags(&[("ho\nst", "sw1")]), value.clone(), ts(0));
        assert!(matches!(err, Err(PointError::LineBreak(_))));

        let err = Point::new("cpu", tags(&[("host", "sw1\r\nx")]), value, ts(0));
        assert!(matches!(err, Err(PointError::LineBreak(_))));

        let err = Point::new("cpu", Tags::new(), fields(&[("va\nlue", 1i64.into())]), ts(0));
        assert!(matches!(err, Err(PointError::LineBreak(_))));

        // String field values are quoted and may span lines.
        let ok = Point::new(
            "cpu",
            tags(&[("host", "sw1")]),
            fields(&[("descr", "line one\nline two".into())]),
            ts(0),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_point_rejects_non_finite_float() {
        let err = Point::new(
            "cpu",
            Tags::new(),
            fields(&[("value", FieldValue::Float(f64::NAN))]),
            ts(0),
        );
        assert!(matches!(err, Err(PointError::NonFiniteFloat { .. })));
    }
}
