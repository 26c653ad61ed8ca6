// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vd_core::test_support::event_at_offer_step;

#[test]
fn missing_file_yields_default_db() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("db.json")).unwrap();
    assert!(store.db().events.is_empty());
    assert_eq!(store.db().schema_version, SCHEMA_VERSION);
}

#[test]
fn commit_then_reopen_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    let event = event_at_offer_step();
    let fingerprint = event.fingerprint();
    {
        let mut store = Store::open(&path).unwrap();
        store.db_mut().events.push(event);
        store.commit().unwrap();
    }

    let db = Store::read(&path).unwrap();
    assert_eq!(db.events.len(), 1);
    assert_eq!(db.events[0].fingerprint(), fingerprint);
}

#[test]
fn lock_path_appends_suffix() {
    assert_eq!(
        lock_path_for(Path::new("/tmp/db.json")),
        PathBuf::from("/tmp/db.json.lock")
    );
}

#[test]
fn empty_file_is_treated_as_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    fs::write(&path, "").unwrap();
    let store = Store::open(&path).unwrap();
    assert!(store.db().events.is_empty());
}

#[test]
fn commit_is_atomic_no_tmp_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let store = Store::open(&path).unwrap();
    store.commit().unwrap();
    assert!(path.exists());
    assert!(!dir.path().join("db.json.tmp").exists());
}

#[test]
fn save_config_bumps_version() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(dir.path().join("db.json")).unwrap();
    assert_eq!(store.config().version, 0);

    let mut config = store.config().clone();
    config.hil_mode.enabled = true;
    store.save_config(config);
    assert_eq!(store.config().version, 1);
    assert!(store.config().hil_mode.enabled);
}

#[test]
fn concurrent_sessions_serialize_on_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    {
        let store = Store::open(&path).unwrap();
        store.commit().unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..4 {
        let path = path.clone();
        handles.push(std::thread::spawn(move || {
            let mut store = Store::open(&path).unwrap();
            let mut event = vd_core::Event::new(format!("c{i}@x.com"), format!("t-{i}"), 0);
            event.msgs.push(format!("m-{i}"));
            store.db_mut().events.push(event);
            store.commit().unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let db = Store::read(&path).unwrap();
    assert_eq!(db.events.len(), 4, "no write may be lost");
}
