// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 6 — transition between acceptance and final confirmation.
//!
//! Verifies that the booking is internally coherent before the handoff
//! message goes out; the message itself is HIL-gated.

use super::enqueue_manual_review;
use crate::error::EngineError;
use crate::state::{GroupResult, StepContext};
use serde_json::json;
use vd_core::requirements::requirements_hash;
use vd_core::{Draft, Event, ThreadState};
use vd_storage::{update_event_metadata, EventPatch};

/// Coherence problems that block the transition.
fn verify(event: &Event) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if !event.date_confirmed || event.chosen_date.is_none() {
        problems.push("date_unconfirmed");
    }
    if event.locked_room_id.is_none() {
        problems.push("room_unlocked");
    }
    if event.current_offer().is_none() {
        problems.push("offer_missing");
    }
    if !event.billing_details.is_complete() {
        problems.push("billing_incomplete");
    }
    let current_hash = requirements_hash(&event.requirements);
    if event.locked_room_id.is_some()
        && event.room_eval_hash.as_deref() != Some(current_hash.as_str())
    {
        problems.push("requirements_drifted");
    }
    problems
}

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let Some(event) = ctx.event() else {
        return Ok(GroupResult::halt("transition_missing_event"));
    };

    if ctx.state.message.is_approval_continuation() {
        let now_ms = ctx.state.now_ms;
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            update_event_metadata(
                event,
                EventPatch::new()
                    .step(7)
                    .thread_state(ThreadState::AwaitingClient)
                    .reason("transition_approved"),
                now_ms,
            );
        }
        ctx.state.extras.persist = true;
        return Ok(GroupResult::halt("transition_approved"));
    }

    let problems = verify(event);
    if !problems.is_empty() {
        tracing::warn!(?problems, "transition blocked");
        enqueue_manual_review(ctx, "transition_incoherent");
        let draft = Draft::new(
            6,
            "transition_blocked",
            "We're double-checking a couple of details on our side before the final step - we'll be right back with you.",
        )
        .with_workflow_footer("Internal review", "Waiting on HIL");
        ctx.state.add_draft(draft);
        ctx.set_thread_state(ThreadState::WaitingOnHil);
        return Ok(GroupResult::halt("transition_blocked")
            .with_payload(json!({ "problems": problems })));
    }

    let (room, date) = (
        event.locked_room_id.clone().unwrap_or_default(),
        event.chosen_date.clone().unwrap_or_default(),
    );
    let hil_enabled = ctx.state.config.hil_mode.enabled;

    let draft = Draft::new(
        6,
        "transition_message",
        format!(
            "Everything is in place for {room} on {date}. Next we'll finalize the booking - I'll send the confirmation details right away."
        ),
    )
    .with_workflow_footer("Final confirmation", "In Progress");
    ctx.state.add_draft(draft);

    let now_ms = ctx.state.now_ms;
    if hil_enabled {
        // The draft is held for review; the step advances once approved.
        ctx.set_thread_state(ThreadState::WaitingOnHil);
        return Ok(GroupResult::halt("transition_ready"));
    }

    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        update_event_metadata(
            event,
            EventPatch::new()
                .step(7)
                .thread_state(ThreadState::AwaitingClient)
                .reason("transition_complete"),
            now_ms,
        );
    }
    ctx.state.extras.persist = true;
    Ok(GroupResult::halt("transition_ready"))
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
