// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-poller control commands.
//!
//! Commands are queued without blocking and applied by the poller between
//! cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A command for one poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetDebug(bool),
    ToggleDebug,
}

/// Create a handle/receiver pair with the initial debug state.
pub fn channel(debug: bool) -> (ControlHandle, ControlReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let debug = Arc::new(AtomicBool::new(debug));
    (
        ControlHandle {
            tx,
            debug: debug.clone(),
        },
        ControlReceiver { rx, debug },
    )
}

/// Sending side, held by the collector and the presentation layer.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlCommand>,
    debug: Arc<AtomicBool>,
}

impl ControlHandle {
    /// Returns false when the poller has stopped.
    pub fn set_debug(&self, enabled: bool) -> bool {
        self.tx.send(ControlCommand::SetDebug(enabled)).is_ok()
    }

    /// Returns false when the poller has stopped.
    pub fn toggle_debug(&self) -> bool {
        self.tx.send(ControlCommand::ToggleDebug).is_ok()
    }

    /// Debug state as last applied by the poller.
    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }
}

/// Receiving side, owned by the poller.
#[derive(Debug)]
pub struct ControlReceiver {
    rx: mpsc::UnboundedReceiver<ControlCommand>,
    debug: Arc<AtomicBool>,
}

impl ControlReceiver {
    /// Wait for the next command. `None` once every handle is dropped.
    pub async fn recv(&mut self) -> Option<ControlCommand> {
        self.rx.recv().await
    }

    /// Apply a command and return the new debug state.
    pub fn apply(&self, command: ControlCommand) -> bool {
        let enabled = match command {
            ControlCommand::SetDebug(enabled) => enabled,
            ControlCommand::ToggleDebug => !self.debug_enabled(),
        };
        self.debug.store(enabled, Ordering::Release);
        enabled
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }
}
