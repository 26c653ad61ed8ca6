// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 7 — final confirmation with deposit and site-visit flows.
//!
//! The billing gate is the checkout moment: the offer went out without
//! asking for billing, but nothing final leaves the house until the address
//! is complete. Deposit payment (button or message) implies intent and skips
//! the review gate.

use super::site_visit;
use crate::error::EngineError;
use crate::propagate::{build_change_context, detect_structural_change, NextStepDecision};
use crate::state::{GroupResult, StepContext};
use serde_json::json;
use vd_core::dates::{format_chf, parse_client_date, to_ddmmyyyy};
use vd_core::site_visit::is_site_visit_change_request;
use vd_core::{ChangeType, ConfirmationPending, Draft, EventStatus, TableBlock, ThreadState};
use vd_storage::{update_event_metadata, EventPatch};

/// How the client's message reads at the confirmation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Confirm,
    DepositPaid,
    Reserve,
    SiteVisit,
    Decline,
    Change,
    Question,
}

/// Keyword classification; the unified detection signals break ties.
pub fn classify(text: &str, detection: &vd_core::UnifiedDetection) -> Classification {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["deposit", "anzahlung"]) && has(&["paid", "transferred", "payment went", "bezahlt"]) {
        return Classification::DepositPaid;
    }
    if has(&["reserve", "hold the date", "option on", "pencil"]) {
        return Classification::Reserve;
    }
    if has(&["site visit", "venue tour", "walkthrough", "viewing", "visit", "besichtigung"]) {
        return Classification::SiteVisit;
    }
    if has(&["cancel", "decline", "not going ahead", "withdraw", "call it off"]) {
        return Classification::Decline;
    }
    if detection.signals.is_change_request {
        return Classification::Change;
    }
    if detection.signals.is_confirmation
        || has(&["confirm", "yes", "go ahead", "proceed", "we're in", "bestätigen"])
    {
        return Classification::Confirm;
    }
    Classification::Question
}

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    if ctx.event().is_none() {
        return Ok(GroupResult::halt("confirmation_missing_event"));
    }

    if ctx.state.message.is_approval_continuation() {
        return process_hil_continuation(ctx);
    }

    // Deposit-paid button: bypass every gate, payment itself confirms
    // intent.
    if ctx.state.message.deposit_just_paid {
        mark_deposit_paid(ctx);
        ctx.state.extras.skip_hil = true;
        return prepare_confirmation(ctx, true);
    }

    // Billing-gate continuation: intake already absorbed any billing in this
    // message; completion releases the final contract.
    let (awaiting_billing, billing_complete) = {
        let Some(event) = ctx.event() else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        (
            event.billing_requirements.awaiting_billing_for_confirmation,
            event.billing_details.is_complete(),
        )
    };
    if awaiting_billing {
        if billing_complete {
            if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
                event.billing_requirements.awaiting_billing_for_confirmation = false;
            }
            ctx.state.extras.persist = true;
            return send_final_contract(ctx);
        }
        return billing_gate(ctx);
    }

    // An explicit event-date change interrupts a site-visit selection; reset
    // the visit so structural detection binds the date to the event again.
    let site_visit_active = ctx
        .event()
        .map(|e| e.site_visit_state.is_active())
        .unwrap_or(false);
    if site_visit_active && is_event_date_change(&ctx.state.body) {
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            event.site_visit_state.reset();
        }
        ctx.state.extras.persist = true;
        tracing::info!("site visit reset by explicit event-date change");
    }

    let detection = ctx.state.detection.clone();
    let structural = {
        let Some(event) = ctx.event() else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        let change_ctx = build_change_context(event, &detection, &ctx.state.body);
        detect_structural_change(event, &detection, &ctx.state.body, &change_ctx)
    };
    if let Some((target, reason)) = structural {
        return structural_detour(ctx, target, reason);
    }

    if let Some(result) = site_visit::handle_active(ctx)? {
        return Ok(result);
    }

    let classification = classify(&ctx.state.body, &detection);
    {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        event.confirmation_state.last_response_type =
            Some(smol_str::SmolStr::new(format!("{classification:?}").to_lowercase()));
    }

    match classification {
        Classification::Confirm => {
            if let Some(result) = billing_gate_if_incomplete(ctx) {
                return Ok(result);
            }
            prepare_confirmation(ctx, false)
        }
        Classification::DepositPaid => {
            mark_deposit_paid(ctx);
            ctx.state.extras.skip_hil = true;
            prepare_confirmation(ctx, true)
        }
        Classification::Reserve => handle_reserve(ctx),
        Classification::SiteVisit => {
            let from_step = ctx.event().map(|e| e.current_step).unwrap_or(7);
            site_visit::start_flow(ctx, from_step)
        }
        Classification::Decline => handle_decline(ctx),
        Classification::Change | Classification::Question => handle_question(ctx),
    }
}

fn is_event_date_change(text: &str) -> bool {
    let lower = text.to_lowercase();
    let names_event_date = lower.contains("event date") || lower.contains("the date of the event");
    let has_verb = ["change", "move", "reschedule", "verschieben"]
        .iter()
        .any(|v| lower.contains(v));
    names_event_date && has_verb && !is_site_visit_change_request(text)
}

fn structural_detour(
    ctx: &mut StepContext<'_>,
    target: u8,
    reason: &'static str,
) -> Result<GroupResult, EngineError> {
    let change = match target {
        2 => ChangeType::Date,
        3 => ChangeType::Requirements,
        _ => ChangeType::Products,
    };
    let decision = {
        let Some(event) = ctx.event() else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        NextStepDecision {
            next_step: target,
            caller_step: event.caller_step.or(Some(event.current_step)),
            needs_reeval: true,
            skip_reason: None,
        }
    };
    let new_date = ctx.state.detection.entities.date_text.clone();
    crate::propagate::apply_detour(ctx, &decision, change, new_date);
    tracing::info!(target, reason, "structural change detour from confirmation");

    // Run the owning step now so the reply addresses the change.
    let chained = (super::handler_for(target))(ctx)?;
    Ok(GroupResult::halt("structural_change_detour").with_payload(json!({
        "detour_to_step": target,
        "reason": reason,
        "chained_action": chained.action,
    })))
}

fn mark_deposit_paid(ctx: &mut StepContext<'_>) {
    let now_ms = ctx.state.now_ms;
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        event.deposit_info.mark_paid();
        event.log_activity("deposit_paid", format_chf(event.deposit_info.amount), now_ms);
    }
    ctx.state.extras.persist = true;
    tracing::info!("deposit marked paid");
}

/// The checkout billing gate. Returns a halt result when billing is
/// incomplete.
fn billing_gate_if_incomplete(ctx: &mut StepContext<'_>) -> Option<GroupResult> {
    let complete = ctx
        .event()
        .map(|e| e.billing_details.is_complete())
        .unwrap_or(false);
    if complete {
        return None;
    }
    Some(match billing_gate(ctx) {
        Ok(result) => result,
        Err(_) => GroupResult::halt("confirmation_billing_gate"),
    })
}

fn billing_gate(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let missing = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        event.billing_requirements.awaiting_billing_for_confirmation = true;
        event.billing_details.missing_fields()
    };
    ctx.state.extras.persist = true;

    let listing = missing
        .iter()
        .map(|f| match *f {
            "name_or_company" => "the name or company for the invoice",
            "street" => "the street address",
            "postal_code" => "the postal code",
            "city" => "the city",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(", ");
    let draft = Draft::new(
        7,
        "billing_gate_at_confirmation",
        format!(
            "Great - I'm ready to finalize your booking! To generate your contract, could you share {listing}?"
        ),
    )
    .with_workflow_footer("Complete billing", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    tracing::info!(?missing, "confirmation blocked on billing");
    Ok(GroupResult::halt("confirmation_billing_gate")
        .with_payload(json!({ "missing_billing_fields": missing })))
}

/// Apply the venue deposit policy the first time confirmation is attempted.
fn ensure_deposit_policy(ctx: &mut StepContext<'_>) {
    let policy = ctx.state.config.global_deposit.clone();
    if !policy.deposit_enabled {
        return;
    }
    let due = ctx
        .state
        .today
        .checked_add_days(chrono::Days::new(u64::from(policy.deposit_deadline_days)))
        .map(to_ddmmyyyy);
    let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
        return;
    };
    if event.deposit_info.required || event.deposit_info.paid {
        return;
    }
    let total = event.current_offer().map(|o| o.total_amount).unwrap_or(0.0);
    event.deposit_info.required = true;
    event.deposit_info.kind = policy.deposit_type;
    event.deposit_info.amount = policy.amount_for(total);
    event.deposit_info.due_date = due;
}

fn prepare_confirmation(
    ctx: &mut StepContext<'_>,
    skip_hil: bool,
) -> Result<GroupResult, EngineError> {
    ensure_deposit_policy(ctx);
    let now_ms = ctx.state.now_ms;

    let (deposit_blocks, deposit_amount, deposit_due) = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        (
            event.deposit_info.blocks_confirmation(),
            event.deposit_info.amount,
            event.deposit_info.due_date.clone(),
        )
    };

    if deposit_blocks {
        {
            let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
                return Ok(GroupResult::halt("confirmation_missing_event"));
            };
            event.deposit_info.mark_requested();
            event.confirmation_state.pending = Some(ConfirmationPending::new("deposit_request"));
            update_event_metadata(
                event,
                EventPatch::new().thread_state(ThreadState::AwaitingClient),
                now_ms,
            );
        }
        ctx.state.extras.persist = true;
        let due_fragment = deposit_due
            .map(|d| format!(" by {d}"))
            .unwrap_or_default();
        let draft = Draft::new(
            7,
            "confirmation_deposit_pending",
            format!(
                "To finalise your booking, please proceed with the deposit of {}{due_fragment}. Once received, I'll confirm your event officially.",
                format_chf(deposit_amount)
            ),
        )
        .with_workflow_footer("Confirm deposit payment", "Awaiting Client");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("confirmation_deposit_requested"));
    }

    // Deposit settled (or never required): confirm and book the calendar.
    let (room, date, participants, total, billing_line, deposit_paid) = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        update_event_metadata(
            event,
            EventPatch::new()
                .status(EventStatus::Confirmed)
                .thread_state(ThreadState::AwaitingClient)
                .reason("confirmed"),
            now_ms,
        );
        event.confirmation_state.pending = Some(ConfirmationPending::new("final_confirmation"));
        event.log_activity("status_confirmed", event.chosen_date.clone().unwrap_or_default(), now_ms);
        (
            event.locked_room_id.clone().unwrap_or_default(),
            event.chosen_date.clone().unwrap_or_default(),
            event.requirements.number_of_participants,
            event.current_offer().map(|o| o.total_amount).unwrap_or(0.0),
            event.billing_details.summary_line(),
            event.deposit_info.paid,
        )
    };
    ctx.state.extras.persist = true;

    if let Some(parsed) = parse_client_date(&date) {
        ctx.calendar.mark_booked(parsed);
    }

    let site_visit_scheduled = ctx
        .event()
        .map(|e| e.site_visit_state.is_scheduled())
        .unwrap_or(false);
    let mut message = format!(
        "We're excited to move forward with your booking for {room} on {date}."
    );
    if deposit_paid && deposit_amount > 0.0 {
        message.push_str(&format!(" Your deposit of {} has been received.", format_chf(deposit_amount)));
    }
    if site_visit_scheduled {
        message.push_str(" Your site visit is already scheduled - we'll finalize the details closer to your event.");
    } else {
        message.push_str(" Would you like to arrange a site visit before we finalize everything?");
    }

    let deposit_cell = if deposit_paid && deposit_amount > 0.0 {
        format!("{} Paid", format_chf(deposit_amount))
    } else if deposit_amount > 0.0 {
        format!("{} Pending", format_chf(deposit_amount))
    } else {
        "None".to_string()
    };
    let table = TableBlock::field_value(vec![
        ("Event Date", date.clone()),
        ("Room", room.clone()),
        (
            "Participants",
            participants.map(|p| p.to_string()).unwrap_or_else(|| "TBD".to_string()),
        ),
        ("Billing Address", billing_line),
        ("Total", format_chf(total)),
        ("Deposit", deposit_cell),
    ]);
    let draft = Draft::new(7, "offer_confirmation", message)
        .requires_approval(!skip_hil)
        .table_blocks(vec![table])
        .with_workflow_footer("Finalize booking", "In Progress");
    ctx.state.add_draft(draft);

    Ok(GroupResult::halt("confirmation_draft").with_payload(json!({
        "room": room,
        "date": date,
        "skip_hil": skip_hil,
    })))
}

fn send_final_contract(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let now_ms = ctx.state.now_ms;
    let (room, date, participants, total, billing_line, deposit_amount, deposit_paid) = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        event.confirmation_state.pending = Some(ConfirmationPending::new("final_confirmation"));
        update_event_metadata(
            event,
            EventPatch::new().thread_state(ThreadState::WaitingOnHil),
            now_ms,
        );
        (
            event.locked_room_id.clone().unwrap_or_default(),
            event.chosen_date.clone().unwrap_or_default(),
            event.requirements.number_of_participants,
            event.current_offer().map(|o| o.total_amount).unwrap_or(0.0),
            event.billing_details.summary_line(),
            event.deposit_info.amount,
            event.deposit_info.paid,
        )
    };
    ctx.state.extras.persist = true;

    let deposit_line = if deposit_paid && deposit_amount > 0.0 {
        format!("Deposit: {} received\n", format_chf(deposit_amount))
    } else if deposit_amount > 0.0 {
        format!("Deposit due: {}\n", format_chf(deposit_amount))
    } else {
        String::new()
    };
    let body = format!(
        "Thank you for providing your billing details.\n\nHere is your final booking confirmation for {room} on {date}:\n\nGuests: {}\nBilling: {billing_line}\nTotal: {}\n{deposit_line}\nYour booking is now confirmed. We look forward to hosting your event!",
        participants.map(|p| p.to_string()).unwrap_or_else(|| "TBD".to_string()),
        format_chf(total),
    );
    let table = TableBlock::field_value(vec![
        ("Document", "FINAL CONTRACT".to_string()),
        ("Event Date", date),
        ("Room", room),
        ("Total", format_chf(total)),
    ]);
    let draft = Draft::new(7, "final_contract_sent", body)
        .requires_approval(true)
        .table_blocks(vec![table])
        .with_workflow_footer("Booking confirmed", "Confirmed");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::WaitingOnHil);
    tracing::info!("final contract drafted");
    Ok(GroupResult::halt("final_contract_ready"))
}

fn handle_reserve(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    ensure_deposit_policy(ctx);
    let now_ms = ctx.state.now_ms;
    let (room, date, amount, valid_until) = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("confirmation_missing_event"));
        };
        event.deposit_info.mark_requested();
        event.confirmation_state.pending = Some(ConfirmationPending::new("reserve_notification"));
        update_event_metadata(
            event,
            EventPatch::new().thread_state(ThreadState::AwaitingClient),
            now_ms,
        );
        (
            event.locked_room_id.clone().unwrap_or_default(),
            event.chosen_date.clone().unwrap_or_default(),
            event.deposit_info.amount,
            event.reservation_valid_until.clone(),
        )
    };
    ctx.state.extras.persist = true;

    let validity = match valid_until {
        Some(deadline) => format!("The option is valid until {deadline}."),
        None => "The option is valid while we hold the date.".to_string(),
    };
    let amount_text = if amount > 0.0 {
        format_chf(amount)
    } else {
        "the agreed deposit".to_string()
    };
    let draft = Draft::new(
        7,
        "confirmation_reserve",
        format!(
            "We've reserved {room} on {date} for you. {validity} To confirm the booking, please proceed with {amount_text}."
        ),
    )
    .with_workflow_footer("Confirm deposit payment", "Awaiting Client");
    ctx.state.add_draft(draft);
    Ok(GroupResult::halt("confirmation_reserve"))
}

fn handle_decline(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let now_ms = ctx.state.now_ms;
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        update_event_metadata(
            event,
            EventPatch::new()
                .status(EventStatus::Cancelled)
                .thread_state(ThreadState::Closed)
                .reason("confirmation_declined"),
            now_ms,
        );
        event.confirmation_state.pending = Some(ConfirmationPending::new("decline"));
        event.log_activity("status_cancelled", "Client declined at confirmation", now_ms);
    }
    ctx.state.extras.persist = true;
    let draft = Draft::new(
        7,
        "confirmation_decline",
        "Thank you for letting us know. We've released the date, and we'd be happy to assist with any future events.",
    )
    .with_workflow_footer("Close booking", "Closed");
    ctx.state.add_draft(draft);
    Ok(GroupResult::halt("confirmation_decline"))
}

fn handle_question(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let body = ctx
        .state
        .extras
        .qna_reply
        .clone()
        .unwrap_or_else(|| "Happy to help. Could you share a bit more detail so I can advise?".to_string());
    let draft = Draft::new(7, "confirmation_question", body)
        .with_workflow_footer("Provide details", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    Ok(GroupResult::halt("confirmation_question"))
}

fn process_hil_continuation(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let pending = ctx
        .event()
        .and_then(|e| e.confirmation_state.pending.clone());
    let Some(pending) = pending else {
        return Ok(GroupResult::halt("confirmation_hil_noop"));
    };
    let now_ms = ctx.state.now_ms;

    match pending.kind.as_str() {
        "final_confirmation" => {
            let (date, site_visit_possible) = {
                let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
                    return Ok(GroupResult::halt("confirmation_missing_event"));
                };
                event.confirmation_state.pending = None;
                update_event_metadata(
                    event,
                    EventPatch::new()
                        .status(EventStatus::Confirmed)
                        .thread_state(ThreadState::AwaitingClient)
                        .reason("confirmation_sent"),
                    now_ms,
                );
                (
                    event.chosen_date.clone(),
                    !event.site_visit_state.is_scheduled(),
                )
            };
            ctx.state.extras.persist = true;
            if let Some(parsed) = date.as_deref().and_then(parse_client_date) {
                ctx.calendar.mark_booked(parsed);
            }
            if site_visit_possible {
                return site_visit::start_flow(ctx, 7);
            }
            Ok(GroupResult::halt("confirmation_finalized"))
        }
        other => {
            if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
                event.confirmation_state.pending = None;
            }
            ctx.state.extras.persist = true;
            Ok(GroupResult::halt("confirmation_hil_noop")
                .with_payload(json!({ "cleared": other })))
        }
    }
}

#[cfg(test)]
#[path = "confirmation_tests.rs"]
mod tests;
