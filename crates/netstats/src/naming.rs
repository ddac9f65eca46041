// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reply name to series name mapping.
//!
//! ```text
//! 1.3.6.1.2.1.31.1.1.1.6.3   -> ifHCInOctets.3      (no aliases)
//! 1.3.6.1.2.1.31.1.1.1.6.3   -> ifHCInOctets.uplink (alias 3 = uplink)
//! 1.3.6.1.2.1.1.3.0          -> sysUpTime           (scalar)
//! ```

use crate::mib::{trim_oid, MibTable};
use crate::pdu::QueryDefinition;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Canonical series identity of one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesName {
    /// Object name (or numeric OID root when the MIB has no name for it).
    pub base: String,
    /// Column label; `None` for scalars.
    pub column: Option<String>,
}

impl SeriesName {
    /// `base` or `base.column`.
    pub fn series_id(&self) -> String {
        match &self.column {
            Some(column) => format!("{}.{}", self.base, column),
            None => self.base.clone(),
        }
    }
}

impl fmt::Display for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.series_id())
    }
}

/// Names replies for one query.
#[derive(Debug, Clone)]
pub struct SeriesNamer {
    mib: Arc<MibTable>,
    objects: HashSet<String>,
    aliases: HashMap<String, String>,
    index_filter: Option<Regex>,
}

impl SeriesNamer {
    pub fn new(mib: Arc<MibTable>, query: &QueryDefinition) -> Self {
        // Numeric objects the MIB can name are matched by that name.
        let objects = query
            .objects
            .iter()
            .map(|o| {
                let o = trim_oid(o);
                mib.name_of(o).unwrap_or(o).to_string()
            })
            .collect();
        Self {
            mib,
            objects,
            aliases: query.aliases.clone(),
            index_filter: query.index_filter.clone(),
        }
    }

    /// Name a reply, or `None` when the value must be dropped.
    pub fn resolve(&self, name: &str) -> Option<SeriesName> {
        let (base, index) = self.split(trim_oid(name))?;

        if !self.objects.contains(&base) {
            return None;
        }

        let column = match index {
            None => None,
            Some(index) if index == "0" => None,
            Some(index) if self.aliases.is_empty() => Some(index.to_string()),
            Some(index) => Some(self.aliases.get(index)?.clone()),
        };

        if let (Some(filter), Some(column)) = (&self.index_filter, &column) {
            if !filter.is_match(column) {
                return None;
            }
        }

        Some(SeriesName { base, column })
    }

    /// Split into object name and index suffix.
    ///
    /// The longest OID prefix known to the MIB wins; otherwise the split is
    /// at the last dot and the numeric root is the base.
    fn split<'a>(&self, oid: &'a str) -> Option<(String, Option<&'a str>)> {
        if oid.is_empty() {
            return None;
        }
        if let Some(name) = self.mib.name_of(oid) {
            return Some((name.to_string(), None));
        }

        let mut end = oid.len();
        while let Some(pos) = oid[..end].rfind('.') {
            if let Some(name) = self.mib.name_of(&oid[..pos]) {
                return Some((name.to_string(), Some(&oid[pos + 1..])));
            }
            end = pos;
        }

        match oid.rfind('.') {
            Some(pos) => Some((oid[..pos].to_string(), Some(&oid[pos + 1..]))),
            // A bare object name, as some sources report.
            None => Some((oid.to_string(), None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::tests::query;

    fn mib() -> Arc<MibTable> {
        Arc::new(MibTable::parse(
            "ifHCInOctets 1.3.6.1.2.1.31.1.1.1.6\n\
             ipAdEntIfIndex 1.3.6.1.2.1.4.20.1.2\n\
             sysUpTime 1.3.6.1.2.1.1.3\n",
        ))
    }

    #[test]
    fn test_index_is_column_without_aliases() {
        let namer = SeriesNamer::new(mib(), &query("traffic", &["ifHCInOctets"]));
        let name = namer.resolve(".1.3.6.1.2.1.31.1.1.1.6.3").expect("named");
        assert_eq!(name.base, "ifHCInOctets");
        assert_eq!(name.column.as_deref(), Some("3"));
        assert_eq!(name.series_id(), "ifHCInOctets.3");
    }

    #[test]
    fn test_scalar_has_no_column() {
        let namer = SeriesNamer::new(mib(), &query("system", &["sysUpTime"]));
        let name = namer.resolve("1.3.6.1.2.1.1.3.0").expect("named");
        assert_eq!(name.series_id(), "sysUpTime");
        assert!(name.column.is_none());
    }

    #[test]
    fn test_aliases_replace_and_restrict_columns() {
        let mut q = query("traffic", &["ifHCInOctets"]);
        q.aliases.insert("3".into(), "uplink".into());
        let namer = SeriesNamer::new(mib(), &q);

        assert_eq!(
            namer.resolve("1.3.6.1.2.1.31.1.1.1.6.3").map(|n| n.series_id()),
            Some("ifHCInOctets.uplink".to_string())
        );
        assert!(namer.resolve("1.3.6.1.2.1.31.1.1.1.6.4").is_none());
    }

    #[test]
    fn test_outside_interest_set_is_dropped() {
        let namer = SeriesNamer::new(mib(), &query("system", &["sysUpTime"]));
        assert!(namer.resolve("1.3.6.1.2.1.31.1.1.1.6.3").is_none());
    }

    #[test]
    fn test_multi_component_index() {
        let namer = SeriesNamer::new(mib(), &query("ip", &["ipAdEntIfIndex"]));
        let name = namer.resolve("1.3.6.1.2.1.4.20.1.2.10.0.0.1").expect("named");
        assert_eq!(name.base, "ipAdEntIfIndex");
        assert_eq!(name.column.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_unknown_root_falls_back_to_numeric() {
        let namer = SeriesNamer::new(mib(), &query("vendor", &["1.3.6.1.4.1.9.9.1"]));
        let name = namer.resolve("1.3.6.1.4.1.9.9.1.7").expect("named");
        assert_eq!(name.series_id(), "1.3.6.1.4.1.9.9.1.7");
    }

    #[test]
    fn test_numeric_object_with_known_name() {
        let namer = SeriesNamer::new(mib(), &query("traffic", &["1.3.6.1.2.1.31.1.1.1.6"]));
        let name = namer.resolve("1.3.6.1.2.1.31.1.1.1.6.1").expect("named");
        assert_eq!(name.series_id(), "ifHCInOctets.1");

        let namer = SeriesNamer::new(mib(), &query("system", &[".1.3.6.1.2.1.1.3"]));
        let name = namer.resolve("1.3.6.1.2.1.1.3.0").expect("named");
        assert_eq!(name.series_id(), "sysUpTime");
    }

    #[test]
    fn test_index_filter() {
        let mut q = query("traffic", &["ifHCInOctets"]);
        q.index_filter = Some(Regex::new("^[12]$").expect("regex"));
        let namer = SeriesNamer::new(mib(), &q);

        assert!(namer.resolve("1.3.6.1.2.1.31.1.1.1.6.1").is_some());
        assert!(namer.resolve("1.3.6.1.2.1.31.1.1.1.6.5").is_none());
    }
}
