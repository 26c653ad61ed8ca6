// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 1 — intake and data capture. Runs for every message.
//!
//! Upserts the client, links or creates the event, merges extracted
//! entities, captures billing anywhere it appears, runs change detection
//! against confirmed variables, and attempts the smart shortcut straight to
//! the offer step when date, room, and requirements line up.

use super::{enqueue_manual_review, nonsense_gate, qna, NonsenseAction};
use crate::error::EngineError;
use crate::propagate::{apply_detour, build_change_context, detect_change, route_change};
use crate::state::{GroupResult, StepContext};
use crate::trace::{trace_bus, TraceKind};
use serde_json::json;
use vd_core::dates::{parse_client_date, to_ddmmyyyy};
use vd_core::requirements::requirements_hash;
use vd_core::{
    BillingDetails, ChangeType, Draft, Event, EventStatus, Intent, ThreadState, TimeValidation,
};
use vd_storage::{
    append_history, event_by_thread, last_event_for_email, tag_message, update_event_metadata,
    upsert_client, EventPatch,
};

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let detection = ctx.state.detection.clone();
    let is_continuation =
        ctx.state.message.is_approval_continuation() || ctx.state.message.deposit_just_paid;

    {
        let from_name = ctx.state.message.from_name.clone();
        let client = upsert_client(ctx.db, &ctx.state.client_id, Some(&from_name));
        append_history(client, &ctx.state.message, &detection);
    }
    ctx.state.extras.persist = true;

    let linked = event_by_thread(ctx.db, &ctx.state.thread_id)
        .or_else(|| last_event_for_email(ctx.db, &ctx.state.client_id));

    if let Some(result) = check_dev_choice(ctx, linked, is_continuation) {
        return Ok(result);
    }

    if detection.signals.is_manager_request {
        ctx.state.event_idx = linked;
        return Ok(manual_review_halt(ctx, "manager_request"));
    }

    if !is_continuation {
        match nonsense_gate(ctx.state.confidence(), &ctx.state.body) {
            NonsenseAction::Proceed => {}
            NonsenseAction::Ignore => {
                tracing::info!(msg_id = %ctx.state.message.msg_id, "nonsense ignored");
                return Ok(GroupResult::halt("nonsense_ignored"));
            }
            NonsenseAction::Hil => {
                ctx.state.event_idx = linked;
                return Ok(manual_review_halt(ctx, "borderline_confidence"));
            }
        }
    }

    if linked.is_none() {
        if let Some(result) = handle_standalone(ctx) {
            return Ok(result);
        }
    }

    let event_idx = match linked {
        Some(idx) => idx,
        None => {
            let event = Event::new(&ctx.state.client_id, &ctx.state.thread_id, ctx.state.now_ms);
            tracing::info!(event_id = %event.event_id, thread_id = %ctx.state.thread_id, "event created");
            ctx.db.events.push(event);
            ctx.db.events.len() - 1
        }
    };
    ctx.state.event_idx = Some(event_idx);

    trace_bus().record(
        &ctx.state.thread_id,
        TraceKind::StepEnter,
        Some(1),
        "intake",
        json!({ "msg_id": ctx.state.message.msg_id }),
        ctx.state.now_ms,
    );

    let msg_id = ctx.state.message.msg_id.clone();
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        tag_message(event, &msg_id);
    }

    capture_billing(ctx);
    merge_requirements(ctx);
    capture_products(ctx);
    validate_times(ctx);

    // A plain acceptance while the offer is out moves the thread into
    // negotiation so the acceptance handler sees it.
    if detection.signals.is_acceptance {
        let now_ms = ctx.state.now_ms;
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            if event.current_step == 4 {
                update_event_metadata(
                    event,
                    EventPatch::new().step(5).reason("offer_accept_signal"),
                    now_ms,
                );
            }
        }
    }

    let change_ctx = {
        let event = ctx
            .event()
            .ok_or_else(|| EngineError::Unexpected("event vanished during intake".to_string()))?;
        build_change_context(event, &detection, &ctx.state.body)
    };

    reject_past_dates(ctx, change_ctx.deposit_date_context);

    let prev_step = ctx.event().map(|e| e.current_step).unwrap_or(1);
    if prev_step > 1 && !is_continuation {
        let change = ctx
            .event()
            .and_then(|event| detect_change(event, &detection, &ctx.state.body, &change_ctx));
        if let Some(change) = change {
            tracing::info!(change = %change, from_step = prev_step, "change detected");
            match change {
                ChangeType::SiteVisit | ChangeType::ClientInfo => {
                    // Handled in place; billing was already captured above.
                }
                _ => {
                    let decision = ctx
                        .event()
                        .map(|event| route_change(event, change, prev_step));
                    if let Some(decision) = decision {
                        if decision.needs_reeval {
                            let new_date = detection.entities.date_text.clone().or_else(|| {
                                detection
                                    .entities
                                    .date_iso
                                    .as_deref()
                                    .map(vd_core::dates::iso_to_ddmmyyyy)
                            });
                            apply_detour(ctx, &decision, change, new_date);
                            return Ok(GroupResult::new("change_detour").with_payload(json!({
                                "change": change.to_string(),
                                "detour_to_step": decision.next_step,
                                "caller_step": decision.caller_step,
                            })));
                        } else if let Some(reason) = &decision.skip_reason {
                            tracing::debug!(change = %change, reason = %reason, "change skipped");
                        }
                    }
                }
            }
        }
    }

    if !change_ctx.in_billing_flow {
        if let Some(result) = try_shortcut(ctx) {
            return Ok(result);
        }
    }

    if !detection.qna_types.is_empty() {
        ctx.state.extras.qna_reply =
            qna::compose_answer(&detection.qna_types, ctx.catalog, &ctx.state.config);
    }

    if let Some(event) = ctx.event() {
        trace_bus().record(
            &ctx.state.thread_id,
            TraceKind::StateSnapshot,
            Some(1),
            "intake_complete",
            json!({
                "current_step": event.current_step,
                "caller_step": event.caller_step,
                "requirements_hash": event.requirements_hash,
            }),
            ctx.state.now_ms,
        );
    }

    Ok(GroupResult::new("intake_complete"))
}

fn check_dev_choice(
    ctx: &mut StepContext<'_>,
    linked: Option<usize>,
    is_continuation: bool,
) -> Option<GroupResult> {
    if !ctx.state.config.dev_mode || is_continuation {
        return None;
    }
    let event = ctx.db.events.get(linked?)?;
    Some(
        GroupResult::halt("dev_choice_required").with_payload(json!({
            "existing_event_id": event.event_id,
            "current_step": event.current_step,
            "options": ["continue_existing", "start_new"],
        })),
    )
}

fn manual_review_halt(ctx: &mut StepContext<'_>, reason: &str) -> GroupResult {
    // Even deferred messages count as processed: tag them so re-delivery
    // stays idempotent.
    let msg_id = ctx.state.message.msg_id.clone();
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        if tag_message(event, &msg_id) {
            ctx.state.extras.persist = true;
        }
    }
    let task_id = enqueue_manual_review(ctx, reason);
    let draft = Draft::new(
        1,
        "manual_review",
        "Thanks for your message. A member of our team will review it shortly to make sure it reaches the right place.",
    )
    .with_workflow_footer("Team review", "Waiting on HIL");
    ctx.state.add_draft(draft);
    if ctx.state.event_idx.is_some() {
        ctx.set_thread_state(ThreadState::WaitingOnHil);
    }
    GroupResult::halt("manual_review_enqueued")
        .with_payload(json!({ "task_id": task_id, "reason": reason }))
}

/// Messages without any event yet: pure Q&A gets a direct answer, anything
/// unclassifiable goes to review. Booking-shaped intents fall through to
/// event creation.
fn handle_standalone(ctx: &mut StepContext<'_>) -> Option<GroupResult> {
    match ctx.state.detection.intent {
        Intent::Qna => {
            let answer = qna::compose_answer(
                &ctx.state.detection.qna_types,
                ctx.catalog,
                &ctx.state.config,
            )
            .unwrap_or_else(|| {
                "Happy to help - could you share a few details about what you're planning?"
                    .to_string()
            });
            let draft = Draft::new(1, "standalone_qna", answer)
                .with_workflow_footer("Awaiting your reply", "Awaiting Client");
            ctx.state.add_draft(draft);
            Some(GroupResult::halt("standalone_qna"))
        }
        Intent::NonEvent => Some(manual_review_halt(ctx, "unclassified_first_contact")),
        _ => None,
    }
}

fn capture_billing(ctx: &mut StepContext<'_>) {
    let captured = ctx
        .state
        .detection
        .entities
        .billing_address
        .clone()
        .and_then(|line| BillingDetails::parse_freeform(&line));
    let Some(captured) = captured else {
        return;
    };
    let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
        return;
    };
    if event.billing_details.absorb(&captured) {
        let complete = event.billing_details.is_complete();
        ctx.state.extras.persist = true;
        trace_bus().record(
            &ctx.state.thread_id,
            TraceKind::EntityCapture,
            None,
            "billing_address",
            json!({ "complete": complete }),
            ctx.state.now_ms,
        );
    }
}

fn merge_requirements(ctx: &mut StepContext<'_>) {
    let entities = ctx.state.detection.entities.clone();
    let now_ms = ctx.state.now_ms;
    let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
        return;
    };
    let mut requirements = event.requirements.clone();
    let changed = requirements.merge_entities(&entities);
    if changed || event.requirements_hash.is_none() {
        let hash = requirements_hash(&requirements);
        update_event_metadata(event, EventPatch::new().requirements(requirements, hash), now_ms);
        ctx.state.extras.persist = true;
    }
}

fn capture_products(ctx: &mut StepContext<'_>) {
    let entities = ctx.state.detection.entities.clone();
    let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
        return;
    };
    let mut changed = false;
    for product in &entities.products_add {
        if !event.selected_products.contains(product) {
            event.selected_products.push(product.clone());
            changed = true;
        }
    }
    for product in &entities.products_remove {
        if let Some(pos) = event.selected_products.iter().position(|p| p == product) {
            event.selected_products.remove(pos);
            changed = true;
        }
    }
    if let Some(menu) = &entities.menu_choice {
        if !event.selected_catering.contains(menu) {
            event.selected_catering.push(menu.clone());
            changed = true;
        }
    }
    if changed {
        ctx.state.extras.persist = true;
    }
}

/// Out-of-hours times warn but never block.
fn validate_times(ctx: &mut StepContext<'_>) {
    let entities = ctx.state.detection.entities.clone();
    let (Some(start), Some(end)) = (entities.start_time, entities.end_time) else {
        return;
    };
    let hours = ctx.state.config.venue.operating_hours.clone();
    let outside = start.as_str() < hours.open.as_str() || end.as_str() > hours.close.as_str();
    if !outside {
        return;
    }
    let warning = format!(
        "Requested time {start}-{end} is outside our regular hours ({}-{}); we'll check whether we can accommodate it.",
        hours.open, hours.close
    );
    ctx.state.extras.time_warning = Some(warning.clone());
    let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
        return;
    };
    event.time_validation = Some(TimeValidation {
        issue: Some("outside_operating_hours".to_string()),
        warning: Some(warning),
        start_time: Some(start),
        end_time: Some(end),
    });
    ctx.state.extras.persist = true;
}

/// A past date from the message never books; route back to date selection.
fn reject_past_dates(ctx: &mut StepContext<'_>, deposit_date_context: bool) {
    if deposit_date_context {
        return;
    }
    let Some(date_text) = ctx
        .state
        .detection
        .entities
        .date_text
        .clone()
        .or_else(|| ctx.state.detection.entities.date_iso.clone())
    else {
        return;
    };
    let Some(parsed) = parse_client_date(&date_text) else {
        return;
    };
    if parsed >= ctx.state.today {
        return;
    }
    let today = ctx.state.today;
    let now_ms = ctx.state.now_ms;
    let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
        return;
    };
    tracing::info!(date = %date_text, today = %today, "past date rejected");
    update_event_metadata(
        event,
        EventPatch::new()
            .step(2)
            .chosen_date(None)
            .date_confirmed(false)
            .reason("past_date_rejected"),
        now_ms,
    );
    ctx.state.extras.past_date_rejected = Some(date_text);
    ctx.state.extras.persist = true;
}

/// Jump straight to the offer when date, room, and requirements are jointly
/// determined and nothing is violated.
fn try_shortcut(ctx: &mut StepContext<'_>) -> Option<GroupResult> {
    if ctx.state.extras.past_date_rejected.is_some() {
        return None;
    }
    let entities = ctx.state.detection.entities.clone();
    let (current_step, requirements, already_confirmed, chosen_date) = {
        let event = ctx.event()?;
        (
            event.current_step,
            event.requirements.clone(),
            event.date_confirmed,
            event.chosen_date.clone(),
        )
    };
    if current_step > 3 {
        return None;
    }

    let date = entities
        .date_text
        .as_deref()
        .or(entities.date_iso.as_deref())
        .and_then(parse_client_date)?;
    let participants = requirements.number_of_participants?;
    let room_name = requirements.preferred_room.clone()?;

    if date < ctx.state.today || !ctx.calendar.is_bookable(date) {
        return None;
    }
    let room = ctx.catalog.room_by_name(&room_name)?;
    if !room.fits(participants) {
        return None;
    }
    if already_confirmed && chosen_date.as_deref() != Some(to_ddmmyyyy(date).as_str()) {
        // Differing date on a confirmed event is change territory, not a
        // shortcut.
        return None;
    }

    let now_ms = ctx.state.now_ms;
    let hash = requirements_hash(&requirements);
    let room_display = room.name.clone();
    let event = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i))?;
    for product in room.required_products {
        if !event.selected_products.contains(&product) {
            event.selected_products.push(product);
        }
    }
    update_event_metadata(
        event,
        EventPatch::new()
            .step(4)
            .caller(None)
            .chosen_date(Some(to_ddmmyyyy(date)))
            .date_confirmed(true)
            .status(EventStatus::DateConfirmed)
            .locked_room(Some(room_display.clone()))
            .room_eval_hash(Some(hash))
            .thread_state(ThreadState::AwaitingClient)
            .reason("smart_shortcut"),
        now_ms,
    );
    ctx.state.extras.shortcut = true;
    ctx.state.extras.persist = true;
    tracing::info!(room = %room_display, date = %to_ddmmyyyy(date), "smart shortcut to offer");

    Some(GroupResult::new("smart_shortcut_to_offer").with_payload(json!({
        "locked_room_id": room_display,
        "chosen_date": to_ddmmyyyy(date),
        "participants": participants,
    })))
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
