// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state flowing through one message cycle.

use chrono::NaiveDate;
use serde_json::Value;
use smol_str::SmolStr;
use vd_adapters::llm::VerbalizeFacts;
use vd_adapters::{CalendarPort, CatalogPort};
use vd_core::{
    Config, Draft, Event, IncomingMessage, Intent, TaskId, ThreadState, UnifiedDetection,
};
use vd_storage::Db;

/// Cross-cutting flags accumulated while handlers run.
#[derive(Debug, Default)]
pub struct Extras {
    /// Something changed; the router must commit.
    pub persist: bool,
    /// A change detour was applied this cycle.
    pub change_detour: bool,
    /// A shortcut fired this cycle.
    pub shortcut: bool,
    pub past_date_rejected: Option<String>,
    pub time_warning: Option<String>,
    /// Composed Q&A answer to append to the primary draft.
    pub qna_reply: Option<String>,
    /// Step being resumed by a HIL approval continuation.
    pub hil_approve_step: Option<u8>,
    /// Skip HIL gating for this cycle (deposit payment implies intent).
    pub skip_hil: bool,
    /// Task enqueued during the cycle, if any.
    pub task_id: Option<TaskId>,
}

/// Mutable state for one `process_msg` cycle.
pub struct WorkflowState {
    pub message: IncomingMessage,
    /// Normalized, history-stripped body.
    pub body: String,
    pub thread_id: String,
    /// Lowercase client email.
    pub client_id: String,
    pub detection: UnifiedDetection,
    /// Index of the owned event in `db.events`.
    pub event_idx: Option<usize>,
    pub drafts: Vec<Draft>,
    /// Facts to verbalize into a draft body, keyed by draft index.
    pub pending_verbalizations: Vec<(usize, VerbalizeFacts)>,
    pub config: Config,
    pub extras: Extras,
    pub now_ms: u64,
    pub today: NaiveDate,
}

impl WorkflowState {
    pub fn new(
        message: IncomingMessage,
        body: String,
        detection: UnifiedDetection,
        config: Config,
        now_ms: u64,
        today: NaiveDate,
    ) -> Self {
        let client_id = message.email_lower();
        let thread_id = message
            .thread_id
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| client_id.clone());
        Self {
            message,
            body,
            thread_id,
            client_id,
            detection,
            event_idx: None,
            drafts: Vec::new(),
            pending_verbalizations: Vec::new(),
            config,
            extras: Extras::default(),
            now_ms,
            today,
        }
    }

    pub fn intent(&self) -> Intent {
        self.detection.intent
    }

    pub fn confidence(&self) -> f64 {
        self.detection.confidence
    }

    pub fn add_draft(&mut self, draft: Draft) -> usize {
        self.drafts.push(draft);
        self.drafts.len() - 1
    }

    /// Queue a draft body for verbalization after handlers finish.
    pub fn add_verbalized_draft(&mut self, draft: Draft, facts: VerbalizeFacts) {
        let idx = self.add_draft(draft);
        self.pending_verbalizations.push((idx, facts));
    }
}

/// What one handler produced.
#[derive(Debug, Clone)]
pub struct GroupResult {
    pub action: SmolStr,
    pub payload: Value,
    /// Stop the pipeline after this handler.
    pub halt: bool,
}

impl GroupResult {
    pub fn new(action: impl Into<SmolStr>) -> Self {
        Self { action: action.into(), payload: Value::Null, halt: false }
    }

    pub fn halt(action: impl Into<SmolStr>) -> Self {
        Self { action: action.into(), payload: Value::Null, halt: true }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Everything a step handler can reach.
pub struct StepContext<'a> {
    pub db: &'a mut Db,
    pub state: &'a mut WorkflowState,
    pub calendar: &'a dyn CalendarPort,
    pub catalog: &'a dyn CatalogPort,
}

impl StepContext<'_> {
    pub fn event(&self) -> Option<&Event> {
        self.state.event_idx.and_then(|i| self.db.events.get(i))
    }

    pub fn event_mut(&mut self) -> Option<&mut Event> {
        self.state.event_idx.and_then(|i| self.db.events.get_mut(i))
    }

    /// Update the conversation state on the event and mark for persist.
    pub fn set_thread_state(&mut self, thread_state: ThreadState) {
        if let Some(event) = self.event_mut() {
            event.thread_state = thread_state;
        }
        self.state.extras.persist = true;
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
