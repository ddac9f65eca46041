// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Netstats point sender
//!
//! Delivers collected samples to a time-series store without dropping them.
//!
//! This crate provides:
//! - Validated, immutable [`Point`]s with a closed [`FieldValue`] type
//! - Size- and time-triggered [`Batch`]ing
//! - A bounded queue that applies backpressure instead of dropping points
//! - Retry-until-success writes with a fixed cool-down ([`RetryPolicy`])
//! - The [`PointStore`] trait a store client implements, plus [`MockStore`]
//!
//! # Overview
//!
//! The crate does NOT speak any store protocol. It hands whole batches to a
//! [`PointStore`]; [`Batch::to_line_protocol`] is available as a wire body.
//!
//! ```text
//! SenderHandle::submit --> queue --> flush loop --> Batch --> PointStore::write
//! ```
//!
//! # Example
//!
//! ```ignore
//! use netstats_sink::{Sender, SenderConfig};
//!
//! let config = SenderConfig::new("http://localhost:8086", "netstats").batch_size(500);
//! let sender = Sender::connect(config, my_store).await?;
//! sender.submit("ifHCInOctets", tags, fields, Utc::now()).await?;
//! ```

pub mod batch;
pub mod config;
pub mod point;
pub mod retry;
pub mod sender;
pub mod store;

pub use batch::Batch;
pub use config::SenderConfig;
pub use point::{FieldValue, Fields, Point, PointError, Tags};
pub use retry::RetryPolicy;
pub use sender::{
    ErrorCallback, Sender, SenderBuilder, SenderError, SenderHandle, SenderStatsSnapshot,
};
pub use store::{DryRunStore, MockStore, PointStore, StoreError, WriteAttempt};
