// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MIB object name table.
//!
//! Loaded from a plain text file with one `name oid` pair per line:
//!
//! ```text
//! # IF-MIB
//! ifHCInOctets   1.3.6.1.2.1.31.1.1.1.6
//! ifHCOutOctets  1.3.6.1.2.1.31.1.1.1.10
//! ```

use crate::config::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Bidirectional object name / OID lookup.
#[derive(Debug, Clone, Default)]
pub struct MibTable {
    by_name: HashMap<String, String>,
    by_oid: HashMap<String, String>,
}

impl MibTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `name oid` text format.
    ///
    /// Blank lines, `#` comments and lines with fewer than two fields are
    /// skipped.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        for line in text.lines() {
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let mut fields = line.split_whitespace();
            if let (Some(name), Some(oid)) = (fields.next(), fields.next()) {
                table.insert(name, oid);
            }
        }
        table
    }

    /// Load a table file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Add one mapping. Leading dots on the OID are ignored.
    pub fn insert(&mut self, name: impl Into<String>, oid: impl AsRef<str>) {
        let name = name.into();
        let oid = trim_oid(oid.as_ref()).to_string();
        self.by_oid.insert(oid.clone(), name.clone());
        self.by_name.insert(name, oid);
    }

    /// Object name registered for `oid`.
    pub fn name_of(&self, oid: &str) -> Option<&str> {
        self.by_oid.get(trim_oid(oid)).map(String::as_str)
    }

    /// OID registered for `name`.
    pub fn oid_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Resolve a query object to the OID to request.
    ///
    /// Numeric OIDs pass through. Scalars get the `.0` instance appended.
    pub fn resolve(&self, object: &str, scalar: bool) -> Result<String, ConfigError> {
        let base = if is_numeric_oid(object) {
            trim_oid(object).to_string()
        } else {
            self.oid_of(object)
                .ok_or_else(|| ConfigError::UnknownObject(object.to_string()))?
                .to_string()
        };
        Ok(if scalar { format!("{}.0", base) } else { base })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Strip the leading dot some agents put on OIDs.
pub fn trim_oid(oid: &str) -> &str {
    oid.strip_prefix('.').unwrap_or(oid)
}

/// Whether `s` looks like a dotted numeric OID.
pub fn is_numeric_oid(s: &str) -> bool {
    let s = trim_oid(s);
    !s.is_empty()
        && s
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
