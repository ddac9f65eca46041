// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batches of points bound for one database.
//!
//! The batch size is a flush trigger, not a hard cap: `push` reports when the
//! threshold is reached and the caller decides when to write.

use crate::point::Point;

/// Retention policy used when none is configured.
pub const DEFAULT_RETENTION_POLICY: &str = "default";

/// An ordered, size-triggered accumulator of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    points: Vec<Point>,
    database: String,
    retention_policy: String,
    threshold: usize,
}

impl Batch {
    /// Create an empty batch.
    ///
    /// An empty `retention_policy` falls back to [`DEFAULT_RETENTION_POLICY`].
    pub fn new(
        database: impl Into<String>,
        retention_policy: impl Into<String>,
        threshold: usize,
    ) -> Self {
        let mut retention_policy = retention_policy.into();
        if retention_policy.is_empty() {
            retention_policy = DEFAULT_RETENTION_POLICY.to_string();
        }
        Self {
            points: Vec::with_capacity(threshold.min(4096)),
            database: database.into(),
            retention_policy,
            threshold,
        }
    }

    /// Append a point.
    ///
    /// Returns `true` once the batch holds at least `threshold` points and
    /// should be flushed.
    pub fn push(&mut self, point: Point) -> bool {
        self.points.push(point);
        self.points.len() >= self.threshold
    }

    /// Hand over the current contents, leaving a fresh empty batch behind.
    pub fn take(&mut self) -> Batch {
        let fresh = Batch::new(
            self.database.clone(),
            self.retention_policy.clone(),
            self.threshold,
        );
        std::mem::replace(self, fresh)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn retention_policy(&self) -> &str {
        &self.retention_policy
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Render every point as Line Protocol, one per line.
    pub fn to_line_protocol(&self) -> String {
        self.points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
