// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn rows_are_monotonic_per_bus() {
    let bus = TraceBus::default();
    bus.record("t-1", TraceKind::StepEnter, Some(1), "intake", json!(null), 10);
    bus.record("t-1", TraceKind::StepExit, Some(1), "intake", json!(null), 11);
    bus.record("t-2", TraceKind::StepEnter, Some(2), "date", json!(null), 12);

    let first = bus.entries("t-1");
    assert_eq!(first.len(), 2);
    assert!(first[0].row_id < first[1].row_id);

    let second = bus.entries("t-2");
    assert!(second[0].row_id > first[1].row_id);
}

#[test]
fn threads_are_isolated() {
    let bus = TraceBus::default();
    bus.record("t-1", TraceKind::EntityCapture, Some(1), "date", json!({"value": "15.04.2026"}), 1);
    assert_eq!(bus.entries("t-1").len(), 1);
    assert!(bus.entries("t-2").is_empty());
}

#[test]
fn ring_drops_oldest() {
    let bus = TraceBus::default();
    for i in 0..600 {
        bus.record("t-1", TraceKind::DbWrite, None, "write", json!(i), i);
    }
    let entries = bus.entries("t-1");
    assert_eq!(entries.len(), 512);
    assert_eq!(entries[0].data, json!(88), "oldest entries dropped first");
}

#[test]
fn clear_resets_threads() {
    let bus = TraceBus::default();
    bus.record("t-1", TraceKind::GatePass, None, "guards", json!(null), 1);
    bus.clear();
    assert!(bus.entries("t-1").is_empty());
}

#[test]
fn kind_serializes_screaming() {
    let json = serde_json::to_string(&TraceKind::AgentPromptIn).unwrap();
    assert_eq!(json, "\"AGENT_PROMPT_IN\"");
}
