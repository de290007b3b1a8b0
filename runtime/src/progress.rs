// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for render-run telemetry.
//!
//! The pipeline emits `ProgressEvent`s through a `tokio::sync::broadcast`
//! channel to every subscriber (the CLI progress bar, JSON output). When no
//! subscriber exists, events are silently dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A progress event emitted during a render run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// The run has started.
    RunStarted { explicit_routes: usize },
    /// Route discovery finished.
    RoutesResolved { seeds: usize, discovered: usize },
    /// A route was rendered and written.
    RouteRendered {
        route: String,
        status: u16,
        attempts: u32,
        elapsed_ms: u64,
    },
    /// A route exhausted its retries; the run aborts.
    RouteFailed { route: String, error: String },
    /// A non-fatal warning occurred.
    Warning { message: String },
    /// Every route was rendered.
    RunComplete { rendered: usize, elapsed_ms: u64 },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Stamps events with the run id and a sequence number. Shared by all
/// concurrent route tasks of a run.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: AtomicU64,
}

impl ProgressReporter {
    pub fn new(tx: Option<ProgressSender>, run_id: impl Into<String>) -> Self {
        Self {
            tx,
            run_id: run_id.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(sender) = &self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(ProgressEvent {
                run_id: self.run_id.clone(),
                seq,
                event,
            });
        }
    }
}
