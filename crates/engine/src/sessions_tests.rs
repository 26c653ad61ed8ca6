// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn info(msg: &str, ms: u64) -> SessionInfo {
    SessionInfo {
        client_id: "client@example.com".to_string(),
        last_msg_id: msg.to_string(),
        last_seen_ms: ms,
    }
}

#[test]
fn touch_and_get() {
    let sessions = ActiveConversations::default();
    sessions.touch("t-1", info("m1", 10));
    assert_eq!(sessions.get("t-1").map(|s| s.last_msg_id), Some("m1".to_string()));
    assert!(sessions.get("t-2").is_none());
}

#[test]
fn re_touch_updates_in_place() {
    let sessions = ActiveConversations::default();
    sessions.touch("t-1", info("m1", 10));
    sessions.touch("t-1", info("m2", 20));
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions.get("t-1").map(|s| s.last_seen_ms), Some(20));
}

#[test]
fn capacity_evicts_stalest() {
    let sessions = ActiveConversations::default();
    for i in 0..1024 {
        sessions.touch(&format!("t-{i}"), info("m", i));
    }
    // t-0 is stalest; a refresh protects t-1
    sessions.touch("t-1", info("m", 2000));
    sessions.touch("t-new", info("m", 2001));

    assert_eq!(sessions.len(), 1024);
    assert!(sessions.get("t-0").is_none(), "stalest entry evicted");
    assert!(sessions.get("t-1").is_some());
    assert!(sessions.get("t-new").is_some());
}
