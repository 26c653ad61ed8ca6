// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 5 — negotiation.
//!
//! Classifies the client's move: accept, decline, commercial counter,
//! structural change, or question. Commercial counters stay here and produce
//! a revised offer; structural changes route through the change DAG;
//! acceptance moves on to transition once billing is complete.

use super::transition;
use crate::error::EngineError;
use crate::propagate::{build_change_context, detect_structural_change, NextStepDecision};
use crate::state::{GroupResult, StepContext};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use vd_core::dates::format_chf;
use vd_core::offer::{offer_hash, LineItem, Offer};
use vd_core::{ChangeType, Draft, EventStatus, Intent, Task, TaskType, ThreadState};
use vd_storage::{enqueue_task, update_event_metadata, EventPatch};

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn discount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})\s*%").unwrap()
    })
}

const COMMERCIAL_WORDS: [&str; 7] =
    ["price", "discount", "cheaper", "budget", "terms", "preis", "rabatt"];

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let Some(event) = ctx.event() else {
        return Ok(GroupResult::halt("negotiation_missing_event"));
    };
    let detection = ctx.state.detection.clone();
    let awaiting_billing = event.billing_requirements.awaiting_billing_for_accept;
    let billing_complete = event.billing_details.is_complete();

    // Billing-gate continuation: intake captured whatever billing this
    // message carried; if the address is now complete, the acceptance flow
    // resumes without the client re-accepting.
    if awaiting_billing {
        if billing_complete {
            let now_ms = ctx.state.now_ms;
            if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
                event.billing_requirements.awaiting_billing_for_accept = false;
                update_event_metadata(
                    event,
                    EventPatch::new().step(6).reason("billing_captured"),
                    now_ms,
                );
            }
            ctx.state.extras.persist = true;
            tracing::info!("billing complete, resuming acceptance");
            return transition::process(ctx);
        }
        if detection.entities.billing_address.is_some() {
            return Ok(remind_missing_billing(ctx));
        }
    }

    let change_ctx = build_change_context(event, &detection, &ctx.state.body);
    if let Some((target, reason)) =
        detect_structural_change(event, &detection, &ctx.state.body, &change_ctx)
    {
        return structural_detour(ctx, target, reason);
    }

    if detection.signals.is_acceptance || detection.intent == Intent::AcceptOffer {
        return handle_accept(ctx);
    }
    if detection.intent == Intent::Cancellation {
        return handle_cancellation(ctx);
    }
    if detection.signals.is_rejection || detection.intent == Intent::DeclineOffer {
        return handle_decline(ctx);
    }

    let lower = ctx.state.body.to_lowercase();
    if COMMERCIAL_WORDS.iter().any(|w| lower.contains(w)) {
        return handle_counter(ctx);
    }

    let body = ctx
        .state
        .extras
        .qna_reply
        .clone()
        .unwrap_or_else(|| {
            "Happy to help - is there anything about the offer you'd like to go through?"
                .to_string()
        });
    let draft = Draft::new(5, "negotiation_question", body)
        .with_workflow_footer("Your thoughts on the offer", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    Ok(GroupResult::halt("negotiation_question"))
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
            return Ok(GroupResult::halt("negotiation_missing_event"));
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
    tracing::info!(target, reason, "structural change detour from negotiation");

    // Run the owning step now so the reply addresses the change.
    let chained = (super::handler_for(target))(ctx)?;
    Ok(GroupResult::halt("structural_change_detour").with_payload(json!({
        "detour_to_step": target,
        "reason": reason,
        "chained_action": chained.action,
    })))
}

fn handle_accept(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let now_ms = ctx.state.now_ms;
    let billing_complete = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("negotiation_missing_event"));
        };
        event.offer_accepted = true;
        event.offer_status = Some("Accepted".into());
        update_event_metadata(event, EventPatch::new().status(EventStatus::Accepted), now_ms);
        event.log_activity("offer_accepted", event.current_offer_id.clone().unwrap_or_default(), now_ms);
        event.billing_details.is_complete()
    };
    ctx.state.extras.persist = true;
    tracing::info!(billing_complete, "offer accepted");

    if billing_complete {
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            update_event_metadata(event, EventPatch::new().step(6).reason("offer_accepted"), now_ms);
        }
        return transition::process(ctx);
    }

    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        event.billing_requirements.awaiting_billing_for_accept = true;
    }
    let result = remind_missing_billing(ctx);
    Ok(GroupResult::halt("offer_accept_pending_billing").with_payload(result.payload))
}

fn remind_missing_billing(ctx: &mut StepContext<'_>) -> GroupResult {
    let missing = ctx
        .event()
        .map(|e| e.billing_details.missing_fields())
        .unwrap_or_default();
    let listing = missing
        .iter()
        .map(|f| match *f {
            "name_or_company" => "the name or company the invoice should go to",
            "street" => "the street address",
            "postal_code" => "the postal code",
            "city" => "the city",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(", ");
    let draft = Draft::new(
        5,
        "billing_request",
        format!(
            "Wonderful - we'd love to move forward! To prepare the paperwork I still need {listing}."
        ),
    )
    .with_workflow_footer("Share billing details", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    GroupResult::halt("billing_reminder").with_payload(json!({ "missing": missing }))
}

fn handle_cancellation(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let now_ms = ctx.state.now_ms;
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        update_event_metadata(
            event,
            EventPatch::new()
                .status(EventStatus::Cancelled)
                .thread_state(ThreadState::Closed)
                .reason("client_cancelled"),
            now_ms,
        );
        event.log_activity("status_cancelled", "Client cancelled during negotiation", now_ms);
    }
    ctx.state.extras.persist = true;
    let draft = Draft::new(
        5,
        "cancellation_ack",
        "Thank you for letting us know. We've released the date, and we'd be happy to assist with any future events.",
    )
    .with_workflow_footer("Close booking", "Closed");
    ctx.state.add_draft(draft);
    Ok(GroupResult::halt("event_cancelled"))
}

fn handle_decline(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
        event.offer_status = Some("Declined".into());
    }
    ctx.state.extras.persist = true;
    let draft = Draft::new(
        5,
        "offer_declined_ack",
        "Sorry to hear the offer doesn't fit. Is there anything we could adjust - the room, the menu, or the budget?",
    )
    .with_workflow_footer("Tell us what to adjust", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    Ok(GroupResult::halt("offer_declined"))
}

/// A commercial counter with an explicit percentage becomes a revised offer
/// carrying the discount as its own line; anything vaguer goes to the team.
fn handle_counter(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let percent = discount_re()
        .captures(&ctx.state.body)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|p| (1.0..=30.0).contains(p));

    let Some(percent) = percent else {
        let snippet: String = ctx.state.body.chars().take(300).collect();
        let task = Task::new(TaskType::NegotiationDecision, ctx.state.now_ms)
            .client_id(ctx.state.client_id.clone())
            .context(format!("commercial counter: {snippet}"));
        let task = match ctx.event() {
            Some(event) => task.event_id(event.event_id.clone()),
            None => task,
        };
        let task_id = enqueue_task(ctx.db, task);
        ctx.state.extras.task_id = Some(task_id);
        ctx.state.extras.persist = true;
        let draft = Draft::new(
            5,
            "negotiation_review",
            "Thanks for the feedback on the numbers - let me check what we can do and come back to you shortly.",
        )
        .with_workflow_footer("We'll get back to you", "In Progress");
        ctx.state.add_draft(draft);
        ctx.set_thread_state(ThreadState::InProgress);
        return Ok(GroupResult::halt("negotiation_counter_queued"));
    };

    let now_ms = ctx.state.now_ms;
    let revised_total = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("negotiation_missing_event"));
        };
        let Some(current) = event.current_offer().cloned() else {
            return Ok(GroupResult::halt("negotiation_missing_offer"));
        };
        let discount = current.total_amount * percent / 100.0;
        let mut items = current.line_items.clone();
        items.push(LineItem::per_event(
            format!("Negotiated discount ({percent}%)"),
            -discount,
        ));
        let total = Offer::total_of(&items);
        let offer_id = vd_core::offer::next_offer_id(&event.offers);
        event.offers.push(Offer {
            offer_id: offer_id.clone(),
            total_amount: total,
            line_items: items.clone(),
            created_at: ctx.state.message.ts.clone(),
        });
        event.current_offer_id = Some(offer_id);
        event.offer_hash = Some(offer_hash(&items));
        event.offer_status = Some("Revised".into());
        total
    };
    ctx.state.extras.persist = true;

    let draft = Draft::new(
        5,
        "offer_revised",
        format!(
            "We can meet you at {percent}% off - the revised total comes to {}.",
            format_chf(revised_total)
        ),
    )
    .with_workflow_footer("Review the revised offer", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    Ok(GroupResult::halt("offer_revised").with_payload(json!({ "total": revised_total })))
}

#[cfg(test)]
#[path = "negotiation_tests.rs"]
mod tests;
