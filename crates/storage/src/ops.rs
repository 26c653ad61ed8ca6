// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations over the store document.
//!
//! `update_event_metadata` applies a sparse [`EventPatch`]: only fields the
//! caller provided are written, and any change to `current_step` or
//! `caller_step` leaves an audit breadcrumb.

use crate::db::Db;
use tracing::debug;
use vd_core::{
    Client, Event, EventStatus, HistoryEntry, IncomingMessage, Requirements, Task, TaskId,
    ThreadState, UnifiedDetection,
};

/// Find or create the client for an email; updates the display name when a
/// new one is provided.
pub fn upsert_client<'db>(db: &'db mut Db, email: &str, name: Option<&str>) -> &'db mut Client {
    let email = email.trim().to_lowercase();
    let idx = match db.clients.iter().position(|c| c.email == email) {
        Some(idx) => idx,
        None => {
            db.clients.push(Client::new(email.clone(), None));
            db.clients.len() - 1
        }
    };
    let client = &mut db.clients[idx];
    if let Some(name) = name {
        if !name.trim().is_empty() {
            client.name = Some(name.trim().to_string());
        }
    }
    client
}

/// Most recent non-cancelled event for a client email.
pub fn last_event_for_email(db: &Db, email: &str) -> Option<usize> {
    let email = email.trim().to_lowercase();
    db.events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.client_id == email && e.status != EventStatus::Cancelled)
        .map(|(i, _)| i)
        .last()
}

/// Event owned by a conversation thread.
pub fn event_by_thread(db: &Db, thread_id: &str) -> Option<usize> {
    db.events.iter().position(|e| e.thread_id == thread_id)
}

/// Sparse update for [`update_event_metadata`]. `Option<Option<T>>` fields
/// distinguish "leave alone" from "clear".
#[derive(Debug, Default, Clone)]
pub struct EventPatch {
    current_step: Option<u8>,
    caller_step: Option<Option<u8>>,
    thread_state: Option<ThreadState>,
    status: Option<EventStatus>,
    chosen_date: Option<Option<String>>,
    date_confirmed: Option<bool>,
    locked_room_id: Option<Option<String>>,
    room_eval_hash: Option<Option<String>>,
    requirements: Option<Requirements>,
    requirements_hash: Option<Option<String>>,
    /// Reason recorded in the audit breadcrumb on step changes.
    reason: Option<String>,
}

impl EventPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: u8) -> Self {
        self.current_step = Some(step);
        self
    }

    pub fn caller(mut self, caller: Option<u8>) -> Self {
        self.caller_step = Some(caller);
        self
    }

    pub fn thread_state(mut self, state: ThreadState) -> Self {
        self.thread_state = Some(state);
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn chosen_date(mut self, date: Option<String>) -> Self {
        self.chosen_date = Some(date);
        self
    }

    pub fn date_confirmed(mut self, confirmed: bool) -> Self {
        self.date_confirmed = Some(confirmed);
        self
    }

    pub fn locked_room(mut self, room: Option<String>) -> Self {
        self.locked_room_id = Some(room);
        self
    }

    pub fn room_eval_hash(mut self, hash: Option<String>) -> Self {
        self.room_eval_hash = Some(hash);
        self
    }

    pub fn requirements(mut self, requirements: Requirements, hash: String) -> Self {
        self.requirements = Some(requirements);
        self.requirements_hash = Some(Some(hash));
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Apply a patch to the event; writes an audit breadcrumb when the step or
/// caller step changes.
pub fn update_event_metadata(event: &mut Event, patch: EventPatch, now_ms: u64) {
    let prev_step = event.current_step;
    let prev_caller = event.caller_step;

    if let Some(step) = patch.current_step {
        event.current_step = step;
    }
    if let Some(caller) = patch.caller_step {
        event.caller_step = caller;
    }
    if let Some(state) = patch.thread_state {
        event.thread_state = state;
    }
    if let Some(status) = patch.status {
        event.status = status;
    }
    if let Some(date) = patch.chosen_date {
        event.chosen_date = date;
    }
    if let Some(confirmed) = patch.date_confirmed {
        event.date_confirmed = confirmed;
    }
    if let Some(room) = patch.locked_room_id {
        event.locked_room_id = room;
    }
    if let Some(hash) = patch.room_eval_hash {
        event.room_eval_hash = hash;
    }
    if let Some(requirements) = patch.requirements {
        event.requirements = requirements;
    }
    if let Some(hash) = patch.requirements_hash {
        event.requirements_hash = hash;
    }

    if event.current_step != prev_step || event.caller_step != prev_caller {
        let reason = patch.reason.unwrap_or_else(|| "step_updated".to_string());
        event.append_audit(prev_step, event.current_step, &reason, now_ms);
        debug!(
            event_id = %event.event_id,
            from = prev_step,
            to = event.current_step,
            caller = ?event.caller_step,
            reason = %reason,
            "step transition"
        );
    }
}

/// Append a step-transition breadcrumb outside of a patch (detour bookkeeping
/// and manual corrections).
pub fn append_audit_entry(event: &mut Event, from_step: u8, to_step: u8, reason: &str, now_ms: u64) {
    event.append_audit(from_step, to_step, reason, now_ms);
}

/// Append a processed message to the client history.
pub fn append_history(
    client: &mut Client,
    msg: &IncomingMessage,
    detection: &UnifiedDetection,
) {
    let snippet: String = msg.body.chars().take(200).collect();
    client.history.push(HistoryEntry {
        msg_id: msg.msg_id.clone(),
        subject: msg.subject.clone(),
        snippet,
        ts: msg.ts.clone(),
        intent: smol_str::SmolStr::new(detection.intent.to_string()),
        confidence: detection.confidence,
    });
    if client.language.is_none() {
        client.language = Some(smol_str::SmolStr::new(detection.language.to_string()));
    }
}

/// Record a msg_id on the event. Returns false when it was already present
/// (duplicate delivery).
pub fn tag_message(event: &mut Event, msg_id: &str) -> bool {
    if msg_id.is_empty() || event.has_msg(msg_id) {
        return false;
    }
    event.msgs.push(msg_id.to_string());
    true
}

/// Queue a task for the HIL operator.
pub fn enqueue_task(db: &mut Db, task: Task) -> TaskId {
    let id = task.task_id.clone();
    db.tasks.push(task);
    id
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
