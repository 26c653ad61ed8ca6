// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 2 — date confirmation.

use super::room;
use crate::error::EngineError;
use crate::propagate::resolve_detour;
use crate::state::{GroupResult, StepContext};
use serde_json::json;
use vd_core::dates::{parse_client_date, to_ddmmyyyy};
use vd_core::{Draft, EventStatus, ThreadState};
use vd_storage::{update_event_metadata, EventPatch};

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    if ctx.event().is_none() {
        return Ok(GroupResult::halt("date_missing_event"));
    }

    let candidate = ctx
        .state
        .detection
        .entities
        .date_text
        .clone()
        .or_else(|| ctx.state.detection.entities.date_iso.clone())
        .and_then(|raw| parse_client_date(&raw))
        .or_else(|| {
            // Day.month without a year resolves against the message year,
            // rolling forward when that day has already passed.
            let (day, month) = vd_core::dates::find_day_month(&ctx.state.body)?;
            let year = ctx.state.message.fallback_year()?;
            vd_core::dates::resolve_day_month(day, month, year, ctx.state.today)
        });

    let Some(date) = candidate else {
        return Ok(propose_candidates(ctx));
    };
    let display_str = to_ddmmyyyy(date);

    // Same-cycle change detour: the new date was recorded unconfirmed; ask
    // the client to lock it in rather than silently rebooking.
    if ctx.state.extras.change_detour {
        let draft = Draft::new(
            2,
            "date_change_pending",
            format!(
                "You'd like to move your event to {display_str} - shall I lock that in? The room fit will be re-checked for the new date."
            ),
        )
        .with_workflow_footer("Confirm the new date", "Awaiting Client Response");
        ctx.state.add_draft(draft);
        ctx.set_thread_state(ThreadState::AwaitingClientResponse);
        return Ok(GroupResult::halt("date_change_pending_confirmation")
            .with_payload(json!({ "proposed_date": display_str })));
    }

    // Re-confirming the already-confirmed date must not restart anything.
    let (already_confirmed, chosen, caller_step) = {
        let Some(event) = ctx.event() else {
            return Ok(GroupResult::halt("date_missing_event"));
        };
        (event.date_confirmed, event.chosen_date.clone(), event.caller_step)
    };
    if already_confirmed && chosen.as_deref() == Some(display_str.as_str()) {
        let draft = Draft::new(
            2,
            "date_reconfirmed",
            format!("{display_str} is locked in for your event - nothing has changed."),
        )
        .with_workflow_footer("Room availability", "In Progress");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("date_reconfirmed"));
    }

    if date < ctx.state.today {
        let mut result = propose_candidates(ctx);
        result.action = "date_rejected_past".into();
        ctx.state.extras.past_date_rejected = Some(display_str);
        return Ok(result);
    }
    if !ctx.calendar.is_bookable(date) || ctx.calendar.is_booked(date) {
        let mut result = propose_candidates(ctx);
        result.action = "date_unavailable".into();
        return Ok(result);
    }

    let now_ms = ctx.state.now_ms;
    {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("date_missing_event"));
        };
        update_event_metadata(
            event,
            EventPatch::new()
                .chosen_date(Some(display_str.clone()))
                .date_confirmed(true)
                .status(EventStatus::DateConfirmed)
                .reason("date_confirmed"),
            now_ms,
        );
        event.log_activity("date_confirmed", display_str.clone(), now_ms);
    }
    ctx.state.extras.persist = true;
    tracing::info!(date = %display_str, "date confirmed");

    if caller_step.is_some() {
        // Coming out of a change detour: hand back to the caller. The room
        // lock was invalidated with the date, so guards will pull the next
        // message through room evaluation.
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            resolve_detour(event, now_ms);
        }
        let draft = Draft::new(
            2,
            "date_updated",
            format!(
                "Noted - your event is now planned for {display_str}. I'll re-check the room fit and update the numbers accordingly."
            ),
        )
        .with_workflow_footer("Room availability", "In Progress");
        ctx.state.add_draft(draft);
        ctx.set_thread_state(ThreadState::InProgress);
        return Ok(GroupResult::halt("date_confirmed").with_payload(json!({
            "chosen_date": display_str,
            "resumed_step": caller_step,
        })));
    }

    let draft = Draft::new(
        2,
        "date_confirmed",
        format!("Great news - {display_str} is available. Let me line up the room options for you."),
    )
    .with_workflow_footer("Room availability", "In Progress");
    ctx.state.add_draft(draft);

    let now_ms = ctx.state.now_ms;
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        update_event_metadata(event, EventPatch::new().step(3).reason("date_confirmed"), now_ms);
    }
    // Chain straight into room evaluation so the reply already carries the
    // options.
    room::process(ctx)
}

/// No usable date: answer with concrete candidates from the calendar.
fn propose_candidates(ctx: &mut StepContext<'_>) -> GroupResult {
    let from = ctx
        .state
        .today
        .checked_add_days(chrono::Days::new(14))
        .unwrap_or(ctx.state.today);
    let candidates = ctx.calendar.candidate_dates(from, 3);
    let listing = candidates
        .iter()
        .map(|d| to_ddmmyyyy(*d))
        .collect::<Vec<_>>()
        .join(", ");

    let body = if listing.is_empty() {
        "Which date did you have in mind for your event?".to_string()
    } else {
        format!(
            "Happy to hold a date for you. Looking at our calendar, these are currently open: {listing}. Would one of them work?"
        )
    };
    let draft = Draft::new(2, "date_options", body)
        .with_workflow_footer("Confirm a date", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);

    GroupResult::halt("date_options_proposed").with_payload(json!({
        "candidates": candidates.iter().map(|d| to_ddmmyyyy(*d)).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
#[path = "date_tests.rs"]
mod tests;
