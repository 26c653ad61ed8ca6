// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 3 — room availability and locking.
//!
//! Three outcomes: one viable room (propose it), several (ranked list), or
//! none (back to date selection with a manager flag). A client's explicit
//! room choice locks immediately when it fits; the hash that licensed the
//! evaluation is recorded next to the lock.

use super::{enqueue_manual_review, offer};
use crate::error::EngineError;
use crate::propagate::resolve_detour;
use crate::state::{GroupResult, StepContext};
use serde_json::json;
use vd_adapters::RoomSpec;
use vd_core::dates::format_chf;
use vd_core::requirements::requirements_hash;
use vd_core::{Draft, TableBlock, ThreadState};
use vd_storage::{update_event_metadata, EventPatch};

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let Some(event) = ctx.event() else {
        return Ok(GroupResult::halt("room_missing_event"));
    };
    let requirements = event.requirements.clone();
    let caller_step = event.caller_step;
    let participants = requirements.number_of_participants;

    let named_room = ctx
        .state
        .detection
        .entities
        .room_preference
        .clone()
        .or_else(|| requirements.preferred_room.clone());

    if let Some(name) = named_room {
        match ctx.catalog.room_by_name(&name) {
            Some(room) if participants.map(|p| room.fits(p)).unwrap_or(true) => {
                return lock_room(ctx, room, caller_step);
            }
            Some(room) => {
                // Named room exists but is too small; fall through to the
                // ranked evaluation with a note.
                tracing::info!(room = %room.name, ?participants, "requested room too small");
            }
            None => {
                tracing::info!(room = %name, "unknown room requested");
            }
        }
    }

    let Some(participants) = participants else {
        let draft = Draft::new(
            3,
            "room_needs_requirements",
            "To match you with the right room, how many guests are you expecting?",
        )
        .with_workflow_footer("Share your headcount", "Awaiting Client Response");
        ctx.state.add_draft(draft);
        ctx.set_thread_state(ThreadState::AwaitingClientResponse);
        return Ok(GroupResult::halt("room_needs_requirements"));
    };

    let fitting = ctx.catalog.rooms_fitting(participants);
    match fitting.len() {
        0 => no_rooms(ctx, participants),
        1 => {
            let room = fitting.into_iter().next().ok_or_else(|| {
                EngineError::Unexpected("fitting rooms vanished".to_string())
            })?;
            propose_single(ctx, room)
        }
        _ => propose_list(ctx, fitting, participants),
    }
}

fn lock_room(
    ctx: &mut StepContext<'_>,
    room: RoomSpec,
    caller_step: Option<u8>,
) -> Result<GroupResult, EngineError> {
    let now_ms = ctx.state.now_ms;
    let room_name = room.name.clone();
    {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("room_missing_event"));
        };
        let hash = event
            .requirements_hash
            .clone()
            .unwrap_or_else(|| requirements_hash(&event.requirements));
        for product in room.required_products {
            if !event.selected_products.contains(&product) {
                event.selected_products.push(product);
            }
        }
        update_event_metadata(
            event,
            EventPatch::new()
                .locked_room(Some(room_name.clone()))
                .room_eval_hash(Some(hash))
                .reason("room_locked"),
            now_ms,
        );
        event.log_activity("room_locked", room_name.clone(), now_ms);
    }
    ctx.state.extras.persist = true;
    tracing::info!(room = %room_name, "room locked");

    if caller_step.is_some() {
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            resolve_detour(event, now_ms);
        }
        let draft = Draft::new(
            3,
            "room_locked",
            format!("{room_name} is confirmed for your updated requirements."),
        )
        .with_workflow_footer("Picking up where we left off", "In Progress");
        ctx.state.add_draft(draft);
        ctx.set_thread_state(ThreadState::InProgress);
        return Ok(GroupResult::halt("room_locked"));
    }

    let now_ms = ctx.state.now_ms;
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        update_event_metadata(event, EventPatch::new().step(4).reason("room_locked"), now_ms);
    }
    // Straight into the offer so the client sees numbers in the same reply.
    offer::process(ctx)
}

fn no_rooms(ctx: &mut StepContext<'_>, participants: u32) -> Result<GroupResult, EngineError> {
    enqueue_manual_review(ctx, "no_rooms_for_requirements");
    let now_ms = ctx.state.now_ms;
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        update_event_metadata(
            event,
            EventPatch::new()
                .step(2)
                .chosen_date(None)
                .date_confirmed(false)
                .reason("no_rooms_available"),
            now_ms,
        );
    }
    let draft = Draft::new(
        3,
        "no_rooms_available",
        format!(
            "For {participants} guests we don't have a fitting room on that date. Could another date work? Our team is also taking a look."
        ),
    )
    .with_workflow_footer("Pick an alternative date", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);
    Ok(GroupResult::halt("no_rooms_available"))
}

fn propose_single(
    ctx: &mut StepContext<'_>,
    room: RoomSpec,
) -> Result<GroupResult, EngineError> {
    let draft = Draft::new(
        3,
        "room_proposed",
        format!(
            "{} fits your group nicely (up to {} guests, from {}). Shall I reserve it for you?",
            room.name,
            room.capacity,
            format_chf(room.base_price)
        ),
    )
    .with_workflow_footer("Confirm the room", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);
    Ok(GroupResult::halt("room_proposed").with_payload(json!({ "room": room.name })))
}

fn propose_list(
    ctx: &mut StepContext<'_>,
    rooms: Vec<RoomSpec>,
    participants: u32,
) -> Result<GroupResult, EngineError> {
    let names: Vec<String> = rooms.iter().map(|r| r.name.clone()).collect();
    let table = TableBlock {
        header: vec!["Room".to_string(), "Capacity".to_string(), "From".to_string()],
        rows: rooms
            .iter()
            .map(|r| {
                vec![r.name.clone(), r.capacity.to_string(), format_chf(r.base_price)]
            })
            .collect(),
    };
    let draft = Draft::new(
        3,
        "room_options",
        format!(
            "A few of our rooms work well for {participants} guests: {}. Which one would you like?",
            names.join(", ")
        ),
    )
    .table_blocks(vec![table])
    .with_workflow_footer("Pick a room", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);
    Ok(GroupResult::halt("room_options").with_payload(json!({ "rooms": names })))
}

#[cfg(test)]
#[path = "room_tests.rs"]
mod tests;
