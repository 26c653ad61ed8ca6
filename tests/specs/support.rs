// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the workspace specs.

use std::path::{Path, PathBuf};
use vd_core::{FakeClock, IncomingMessage};
use vd_engine::{Engine, EngineDeps};
use vd_storage::Store;

pub fn engine() -> Engine<FakeClock> {
    Engine::new(EngineDeps::default(), FakeClock::new())
}

pub fn db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("db.json")
}

pub fn msg(msg_id: &str, body: &str) -> IncomingMessage {
    IncomingMessage {
        msg_id: msg_id.to_string(),
        from_name: "Anna Client".to_string(),
        from_email: "a@x.com".to_string(),
        subject: "Re: booking".to_string(),
        body: body.to_string(),
        ts: "2026-01-01T00:00:00Z".to_string(),
        thread_id: Some("thread-1".to_string()),
        session_id: None,
        is_continuation: false,
        deposit_just_paid: false,
    }
}

/// Seed a store with one event built by the given closure.
pub fn seed_event(path: &Path, build: impl FnOnce(&mut vd_core::Event)) {
    let mut store = Store::open(path).expect("open store");
    let mut event = vd_core::Event::new("a@x.com", "thread-1", 0);
    build(&mut event);
    store.db_mut().events.push(event);
    store.commit().expect("commit seed");
}

pub fn read_event(path: &Path) -> vd_core::Event {
    Store::read(path).expect("read store").events[0].clone()
}
