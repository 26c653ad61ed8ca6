// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trace bus: per-thread ordered log of structured workflow events.
//!
//! Feeds the activity transformer and the debug surface. Retention is
//! bounded per thread; oldest entries drop first. `row_id` is process-wide
//! monotonic and defines the UI ordering.

use parking_lot::Mutex;
use serde::Serialize;
use smol_str::SmolStr;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Entries retained per thread before FIFO drop.
const RING_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceKind {
    StepEnter,
    StepExit,
    GatePass,
    GateFail,
    DbRead,
    DbWrite,
    EntityCapture,
    DraftSend,
    StateSnapshot,
    AgentPromptIn,
    AgentPromptOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub row_id: u64,
    pub ts_ms: u64,
    pub kind: TraceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    pub detail: SmolStr,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_step: Option<u8>,
}

/// In-memory, append-only per-thread ring.
#[derive(Default)]
pub struct TraceBus {
    threads: Mutex<HashMap<String, VecDeque<TraceEntry>>>,
    next_row: AtomicU64,
}

impl TraceBus {
    pub fn record(
        &self,
        thread_id: &str,
        kind: TraceKind,
        step: Option<u8>,
        detail: &str,
        data: serde_json::Value,
        ts_ms: u64,
    ) {
        let entry = TraceEntry {
            row_id: self.next_row.fetch_add(1, Ordering::Relaxed),
            ts_ms,
            kind,
            step,
            detail: SmolStr::new(detail),
            data,
            owner_step: step,
        };
        let mut threads = self.threads.lock();
        let ring = threads.entry(thread_id.to_string()).or_default();
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(entry);
    }

    /// Snapshot of a thread's entries in row order.
    pub fn entries(&self, thread_id: &str) -> Vec<TraceEntry> {
        self.threads
            .lock()
            .get(thread_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Test reset hook.
    pub fn clear(&self) {
        self.threads.lock().clear();
    }
}

/// Process-wide trace bus.
pub fn trace_bus() -> &'static TraceBus {
    static BUS: OnceLock<TraceBus> = OnceLock::new();
    BUS.get_or_init(TraceBus::default)
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
