// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change propagation: deterministic routing when a confirmed variable moves.
//!
//! Detection is dual-condition: a revision verb AND a bound target noun must
//! both be present (in any supported language), backed by the classifier's
//! change signal. Pure Q&A never detours. The DAG maps each change type to
//! its owning step; the detour protocol preserves the innermost caller step
//! when detours compose.

use crate::state::StepContext;
use regex::Regex;
use smol_str::SmolStr;
use std::sync::OnceLock;
use vd_core::dates::iso_to_ddmmyyyy;
use vd_core::requirements::requirements_hash;
use vd_core::site_visit::is_site_visit_change_request;
use vd_core::{ChangeType, Entities, Event, UnifiedDetection};
use vd_storage::{update_event_metadata, EventPatch};

const REVISION_VERBS: [&str; 15] = [
    "change",
    "move",
    "reschedule",
    "switch",
    "postpone",
    "shift",
    "update",
    "instead",
    "verschieben",
    "ändern",
    "wechseln",
    "déplacer",
    "changer",
    "spostare",
    "cambiar",
];

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn deposit_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(paid|payment|transferred|deposit|anzahlung)\b.{0,60}\b\d{1,2}[./]\d{1,2}[./]\d{2,4}\b|\b\d{1,2}[./]\d{1,2}[./]\d{2,4}\b.{0,60}\b(paid|payment|transferred|deposit|anzahlung)\b",
        )
        .unwrap()
    })
}

fn has_revision_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    REVISION_VERBS.iter().any(|v| lower.contains(v))
}

fn target_words(change: ChangeType) -> &'static [&'static str] {
    match change {
        ChangeType::Date => &["date", "day", "datum", "fecha", "data", "tag"],
        ChangeType::Room => &["room", "raum", "salle", "sala", "venue", "hall"],
        ChangeType::Requirements => &[
            "guests",
            "participants",
            "people",
            "personen",
            "teilnehmer",
            "layout",
            "seating",
            "duration",
            "time",
        ],
        ChangeType::Products => &["product", "catering", "menu", "lunch", "apéro", "equipment"],
        ChangeType::Commercial => &["price", "cost", "discount", "terms", "preis", "rabatt"],
        ChangeType::Deposit => &["deposit", "anzahlung", "reservation", "option"],
        ChangeType::SiteVisit | ChangeType::ClientInfo => &[],
    }
}

fn has_bound_target(text: &str, change: ChangeType) -> bool {
    let lower = text.to_lowercase();
    target_words(change).iter().any(|t| lower.contains(t))
}

/// Guards that keep change detection honest for one message.
#[derive(Debug, Clone, Default)]
pub struct ChangeContext {
    /// Accepted offer still waiting on billing; nothing detours.
    pub in_billing_flow: bool,
    /// "We paid the deposit on 02.01.2026": the date is a payment date.
    pub deposit_date_context: bool,
    /// Site-visit selection in flight; dates bind to the visit.
    pub site_visit_active: bool,
    /// Classifier says pure question.
    pub qna_no_change: bool,
    /// Message explicitly names the event date (overrides the visit guard).
    pub explicit_event_date: bool,
}

pub fn build_change_context(
    event: &Event,
    detection: &UnifiedDetection,
    text: &str,
) -> ChangeContext {
    let lower = text.to_lowercase();
    ChangeContext {
        in_billing_flow: event.billing_requirements.billing_flow_active(),
        deposit_date_context: deposit_date_re().is_match(text),
        site_visit_active: event.site_visit_state.is_active(),
        qna_no_change: detection.is_pure_question(),
        explicit_event_date: lower.contains("event date") || lower.contains("veranstaltungsdatum"),
    }
}

fn new_date_text(entities: &Entities) -> Option<String> {
    entities
        .date_text
        .clone()
        .or_else(|| entities.date_iso.as_deref().map(iso_to_ddmmyyyy))
}

/// Dual-condition change detection for pre-route (step 1) routing.
///
/// Requires the revision+target pair AND a differing value for value-bearing
/// changes. Returns the highest-priority change found.
pub fn detect_change(
    event: &Event,
    detection: &UnifiedDetection,
    text: &str,
    ctx: &ChangeContext,
) -> Option<ChangeType> {
    if ctx.qna_no_change || ctx.in_billing_flow {
        return None;
    }

    if is_site_visit_change_request(text) {
        return Some(ChangeType::SiteVisit);
    }

    let revision =
        has_revision_signal(text) || detection.signals.is_change_request;
    if !revision {
        // Billing details arriving without a revision verb still count as
        // client info capture.
        if detection.entities.billing_address.is_some() {
            return Some(ChangeType::ClientInfo);
        }
        return None;
    }

    let date_guarded =
        ctx.deposit_date_context || (ctx.site_visit_active && !ctx.explicit_event_date);
    if !date_guarded && has_bound_target(text, ChangeType::Date) && event.date_confirmed {
        if let Some(new_date) = new_date_text(&detection.entities) {
            if Some(new_date.as_str()) != event.chosen_date.as_deref() {
                return Some(ChangeType::Date);
            }
        } else {
            // "can we move the date?" without a concrete new date still
            // re-opens date selection
            return Some(ChangeType::Date);
        }
    }

    if has_bound_target(text, ChangeType::Room) && event.locked_room_id.is_some() {
        let differs = match (&detection.entities.room_preference, &event.locked_room_id) {
            (Some(new), Some(current)) => !new.eq_ignore_ascii_case(current),
            _ => true,
        };
        if differs {
            return Some(ChangeType::Room);
        }
    }

    if has_bound_target(text, ChangeType::Requirements) {
        return Some(ChangeType::Requirements);
    }
    if has_bound_target(text, ChangeType::Products)
        || !detection.entities.products_add.is_empty()
        || !detection.entities.products_remove.is_empty()
    {
        return Some(ChangeType::Products);
    }
    if has_bound_target(text, ChangeType::Commercial) {
        return Some(ChangeType::Commercial);
    }
    if has_bound_target(text, ChangeType::Deposit) {
        return Some(ChangeType::Deposit);
    }
    if detection.entities.billing_address.is_some() {
        return Some(ChangeType::ClientInfo);
    }
    None
}

/// Looser structural check used inside steps 5-7: any differing confirmed
/// variable counts, guards still apply. Returns (target step, audit reason).
pub fn detect_structural_change(
    event: &Event,
    detection: &UnifiedDetection,
    text: &str,
    ctx: &ChangeContext,
) -> Option<(u8, &'static str)> {
    if ctx.qna_no_change {
        return None;
    }

    let date_guarded = ctx.deposit_date_context || ctx.site_visit_active;
    if !date_guarded {
        if let Some(new_date) = new_date_text(&detection.entities) {
            if Some(new_date.as_str()) != event.chosen_date.as_deref() {
                return Some((2, "confirmation_changed_date"));
            }
        }
    }

    if let Some(new_room) = &detection.entities.room_preference {
        if event
            .locked_room_id
            .as_deref()
            .is_some_and(|current| !new_room.eq_ignore_ascii_case(current))
        {
            return Some((3, "confirmation_changed_room"));
        }
    }

    if let Some(participants) = detection.entities.participants {
        if event.requirements.number_of_participants != Some(participants) {
            return Some((3, "confirmation_changed_participants"));
        }
    }

    if !detection.entities.products_add.is_empty()
        || !detection.entities.products_remove.is_empty()
    {
        return Some((4, "confirmation_changed_products"));
    }

    None
}

/// Routing decision produced by the DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStepDecision {
    pub next_step: u8,
    pub caller_step: Option<u8>,
    pub needs_reeval: bool,
    pub skip_reason: Option<SmolStr>,
}

/// Map a detected change to the step that owns it.
pub fn route_change(event: &Event, change: ChangeType, from_step: u8) -> NextStepDecision {
    let Some(owner) = change.owner_step() else {
        return NextStepDecision {
            next_step: from_step,
            caller_step: event.caller_step,
            needs_reeval: false,
            skip_reason: Some(SmolStr::new(match change {
                ChangeType::SiteVisit => "handled_in_place",
                _ => "no_detour",
            })),
        };
    };

    // Requirements changes that land on the already-licensed hash skip the
    // re-evaluation entirely.
    if change == ChangeType::Requirements && event.locked_room_id.is_some() {
        let current = requirements_hash(&event.requirements);
        if event.room_eval_hash.as_deref() == Some(current.as_str()) {
            return NextStepDecision {
                next_step: from_step,
                caller_step: event.caller_step,
                needs_reeval: false,
                skip_reason: Some(SmolStr::new("hash_match")),
            };
        }
    }

    // Compose: the innermost caller survives nested detours. A forward move
    // is ordinary progression and records no caller.
    let caller = match event.caller_step {
        Some(existing) => Some(existing),
        None if owner < from_step => Some(from_step),
        None => None,
    };

    NextStepDecision { next_step: owner, caller_step: caller, needs_reeval: true, skip_reason: None }
}

/// Apply a detour decision to the event. A DATE detour also invalidates the
/// room lock and its licensing hash.
pub fn apply_detour(
    ctx: &mut StepContext<'_>,
    decision: &NextStepDecision,
    change: ChangeType,
    new_date: Option<String>,
) {
    let now_ms = ctx.state.now_ms;
    let Some(event) = ctx.event_mut() else {
        return;
    };
    if !decision.needs_reeval {
        return;
    }

    let mut patch = EventPatch::new()
        .step(decision.next_step)
        .caller(decision.caller_step)
        .reason(format!("change_detour_{change}"));

    if change == ChangeType::Date {
        patch = patch
            .date_confirmed(false)
            .chosen_date(new_date)
            .locked_room(None)
            .room_eval_hash(None);
    }

    update_event_metadata(event, patch, now_ms);
    let event_id = event.event_id.clone();
    ctx.state.extras.change_detour = true;
    ctx.state.extras.persist = true;
    tracing::info!(
        event_id = %event_id,
        change = %change,
        next_step = decision.next_step,
        caller = ?decision.caller_step,
        "change detour applied"
    );
}

/// Restore the caller step after the owning step completed successfully.
pub fn resolve_detour(event: &mut Event, now_ms: u64) -> bool {
    let Some(caller) = event.caller_step else {
        return false;
    };
    let patch = EventPatch::new().step(caller).caller(None).reason("detour_resolved");
    update_event_metadata(event, patch, now_ms);
    true
}

#[cfg(test)]
#[path = "propagate_tests.rs"]
mod tests;
