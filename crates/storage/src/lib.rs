// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vd-storage: The persisted event store.
//!
//! A single JSON document `{clients, events, tasks, config, schema_version}`
//! guarded by a cross-process advisory file lock. The router holds the lock
//! for the entire read-modify-write cycle of one message.

mod db;
mod ops;

pub use db::{lock_path_for, Db, Store, StoreError, SCHEMA_VERSION};
pub use ops::{
    append_audit_entry, append_history, enqueue_task, event_by_thread, last_event_for_email,
    tag_message, update_event_metadata, upsert_client, EventPatch,
};
