// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-memory map of active conversations.
//!
//! Mirrors the store: thread_id → last-seen session info. Bounded by
//! least-recently-touched eviction so long-running deployments don't grow
//! without limit.

use indexmap::IndexMap;
use parking_lot::Mutex;

const MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub client_id: String,
    pub last_msg_id: String,
    pub last_seen_ms: u64,
}

/// Thread-safe, insertion-ordered session map.
#[derive(Default)]
pub struct ActiveConversations {
    inner: Mutex<IndexMap<String, SessionInfo>>,
}

impl ActiveConversations {
    /// Record activity on a thread, evicting the stalest entry at capacity.
    pub fn touch(&self, thread_id: &str, info: SessionInfo) {
        let mut map = self.inner.lock();
        // Re-inserting moves the entry to the back (most recent).
        map.shift_remove(thread_id);
        if map.len() == MAX_SESSIONS {
            map.shift_remove_index(0);
        }
        map.insert(thread_id.to_string(), info);
    }

    pub fn get(&self, thread_id: &str) -> Option<SessionInfo> {
        self.inner.lock().get(thread_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
