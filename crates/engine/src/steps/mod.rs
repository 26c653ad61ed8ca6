// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seven step handlers, dispatched by `current_step`.
//!
//! Handlers are synchronous: detection ran before them, verbalization runs
//! after. Each consumes the shared [`StepContext`] and returns a
//! [`GroupResult`]; drafts accumulate on the workflow state.

pub mod confirmation;
pub mod date;
pub mod intake;
pub mod negotiation;
pub mod offer;
pub mod qna;
pub mod room;
pub mod site_visit;
pub mod transition;

use crate::error::EngineError;
use crate::state::{GroupResult, StepContext};
use vd_core::{Task, TaskId, TaskType};
use vd_storage::enqueue_task;

pub type StepHandler = fn(&mut StepContext<'_>) -> Result<GroupResult, EngineError>;

/// Dispatch table indexed by `current_step`. Out-of-range steps clamp.
pub fn handler_for(step: u8) -> StepHandler {
    match step.clamp(1, 7) {
        1 => intake::process,
        2 => date::process,
        3 => room::process,
        4 => offer::process,
        5 => negotiation::process,
        6 => transition::process,
        _ => confirmation::process,
    }
}

/// Outcome of the low-confidence gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonsenseAction {
    Proceed,
    /// No reply, no processing.
    Ignore,
    /// Borderline: defer to a human.
    Hil,
}

/// Confidence-based gate for off-topic noise. Workflow-signal words rescue
/// borderline messages (short confirmations score low on classifiers).
pub fn nonsense_gate(confidence: f64, text: &str) -> NonsenseAction {
    let lower = text.to_lowercase();
    let has_workflow_signal = [
        "confirm", "date", "room", "offer", "deposit", "book", "event", "visit", "yes", "ok",
        "thank",
    ]
    .iter()
    .any(|w| lower.contains(w));

    if has_workflow_signal || text.trim().is_empty() {
        return NonsenseAction::Proceed;
    }
    if confidence < 0.3 {
        return NonsenseAction::Ignore;
    }
    if confidence < 0.5 {
        return NonsenseAction::Hil;
    }
    NonsenseAction::Proceed
}

/// Queue a manual-review task for the current message and return its id.
pub fn enqueue_manual_review(ctx: &mut StepContext<'_>, reason: &str) -> TaskId {
    let snippet: String = ctx.state.message.body.chars().take(200).collect();
    let context = format!(
        "reason={reason}; subject={}; snippet={snippet}",
        ctx.state.message.subject
    );
    let event_id = ctx.event().map(|e| e.event_id.clone());
    let mut task = Task::new(TaskType::ManualReview, ctx.state.now_ms)
        .client_id(ctx.state.client_id.clone())
        .context(context);
    if let Some(event_id) = event_id {
        task = task.event_id(event_id);
    }
    let task_id = enqueue_task(ctx.db, task);
    ctx.state.extras.task_id = Some(task_id.clone());
    ctx.state.extras.persist = true;
    task_id
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
