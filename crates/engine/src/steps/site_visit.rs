// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Venue-wide site-visit flow, driven from step 7 but usable from any step.
//!
//! Date selection → time selection → explicit confirmation → scheduled.
//! Visits are hard-blocked on event days; blocked dates, weekday rules, and
//! the minimum lead time come from config.

use crate::error::EngineError;
use crate::state::{GroupResult, StepContext};
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use vd_core::dates::{parse_client_date, to_ddmmyyyy, to_iso};
use vd_core::{Draft, SiteVisitStatus, ThreadState};

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}:\d{2})\b").unwrap()
    })
}

/// Dates carrying a confirmed event; site visits never land on these.
fn event_dates(ctx: &StepContext<'_>) -> Vec<NaiveDate> {
    ctx.db
        .events
        .iter()
        .filter(|e| e.date_confirmed && e.status != vd_core::EventStatus::Cancelled)
        .filter_map(|e| e.chosen_date.as_deref().and_then(parse_client_date))
        .collect()
}

fn visit_date_ok(ctx: &StepContext<'_>, date: NaiveDate) -> bool {
    let config = &ctx.state.config.site_visit;
    let min_day = ctx
        .state
        .today
        .checked_add_days(chrono::Days::new(u64::from(config.min_days_ahead)))
        .unwrap_or(ctx.state.today);
    if date < min_day {
        return false;
    }
    if config.weekdays_only && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    if config.blocked_dates.iter().any(|b| b == &to_iso(date)) {
        return false;
    }
    !event_dates(ctx).contains(&date)
}

/// Candidate visit dates honoring every configured rule.
pub fn candidate_dates(ctx: &StepContext<'_>, count: usize) -> Vec<String> {
    let mut candidates = Vec::with_capacity(count);
    let mut date = ctx.state.today;
    for _ in 0..120 {
        if candidates.len() == count {
            break;
        }
        if visit_date_ok(ctx, date) {
            candidates.push(to_iso(date));
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    candidates
}

/// Begin the flow: propose dates.
pub fn start_flow(ctx: &mut StepContext<'_>, from_step: u8) -> Result<GroupResult, EngineError> {
    let dates = candidate_dates(ctx, 3);
    let listing = dates
        .iter()
        .filter_map(|d| parse_client_date(d))
        .map(to_ddmmyyyy)
        .collect::<Vec<_>>()
        .join(", ");
    {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("site_visit_missing_event"));
        };
        event.site_visit_state.start_flow(from_step, dates.clone());
    }
    ctx.state.extras.persist = true;

    let body = if listing.is_empty() {
        "We'd love to show you around. Which day would suit you for a site visit?".to_string()
    } else {
        format!(
            "We'd love to show you around before the event. These days are open for a site visit: {listing}. Which one suits you?"
        )
    };
    let draft = Draft::new(7, "site_visit_dates", body)
        .with_workflow_footer("Pick a visit date", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);
    Ok(GroupResult::halt("site_visit_dates_proposed").with_payload(json!({ "dates": dates })))
}

/// Advance an active flow with the client's reply. Returns `None` when no
/// flow is active.
pub fn handle_active(ctx: &mut StepContext<'_>) -> Result<Option<GroupResult>, EngineError> {
    let status = match ctx.event() {
        Some(event) => event.site_visit_state.status,
        None => return Ok(None),
    };
    match status {
        SiteVisitStatus::DatePending => Ok(Some(pick_date(ctx)?)),
        SiteVisitStatus::TimePending => Ok(Some(pick_time(ctx)?)),
        SiteVisitStatus::ConfirmPending => Ok(Some(confirm_slot(ctx)?)),
        _ => Ok(None),
    }
}

fn pick_date(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let picked = ctx
        .state
        .detection
        .entities
        .date_iso
        .clone()
        .or_else(|| ctx.state.detection.entities.date_text.clone())
        .and_then(|raw| parse_client_date(&raw));

    let Some(date) = picked else {
        let draft = Draft::new(
            7,
            "site_visit_dates",
            "Which of the proposed days would work for your visit?",
        )
        .with_workflow_footer("Pick a visit date", "Awaiting Client Response");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("site_visit_date_unclear"));
    };

    if !visit_date_ok(ctx, date) {
        let alternatives = candidate_dates(ctx, 3)
            .iter()
            .filter_map(|d| parse_client_date(d))
            .map(to_ddmmyyyy)
            .collect::<Vec<_>>()
            .join(", ");
        let draft = Draft::new(
            7,
            "site_visit_dates",
            format!(
                "{} isn't available for a visit (event days and blocked days are excluded). These would work: {alternatives}.",
                to_ddmmyyyy(date)
            ),
        )
        .with_workflow_footer("Pick a visit date", "Awaiting Client Response");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("site_visit_date_blocked"));
    }

    let slots = ctx.state.config.site_visit.slots.clone();
    {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("site_visit_missing_event"));
        };
        event.site_visit_state.set_time_pending(to_iso(date), slots.clone());
    }
    ctx.state.extras.persist = true;
    let draft = Draft::new(
        7,
        "site_visit_slots",
        format!(
            "{} works. We have these time slots: {}. Which one shall I hold?",
            to_ddmmyyyy(date),
            slots.join(", ")
        ),
    )
    .with_workflow_footer("Pick a time slot", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);
    Ok(GroupResult::halt("site_visit_time_pending"))
}

fn pick_time(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let (slots, selected_date) = match ctx.event() {
        Some(event) => (
            event.site_visit_state.proposed_slots.clone(),
            event.site_visit_state.selected_date.clone(),
        ),
        None => return Ok(GroupResult::halt("site_visit_missing_event")),
    };
    let wanted = ctx
        .state
        .detection
        .entities
        .start_time
        .clone()
        .or_else(|| time_re().captures(&ctx.state.body).map(|c| c[1].to_string()));

    let slot = wanted.filter(|w| slots.iter().any(|s| s == w));
    let Some(slot) = slot else {
        let draft = Draft::new(
            7,
            "site_visit_slots",
            format!("Which of these slots works for you: {}?", slots.join(", ")),
        )
        .with_workflow_footer("Pick a time slot", "Awaiting Client Response");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("site_visit_time_unclear"));
    };

    let date = selected_date.unwrap_or_default();
    let pending = format!("{date} at {slot}");
    {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("site_visit_missing_event"));
        };
        event.site_visit_state.set_pending_confirmation(pending.clone());
    }
    ctx.state.extras.persist = true;
    let display = vd_core::dates::iso_to_ddmmyyyy(&date);
    let draft = Draft::new(
        7,
        "site_visit_confirm",
        format!("To confirm: a site visit on {display} at {slot}. Shall I book it?"),
    )
    .with_workflow_footer("Confirm the visit", "Awaiting Client Response");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClientResponse);
    Ok(GroupResult::halt("site_visit_confirm_pending").with_payload(json!({ "slot": pending })))
}

fn confirm_slot(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let lower = ctx.state.body.to_lowercase();
    let affirmative = ["yes", "ok", "confirm", "book it", "perfect", "works", "passt"]
        .iter()
        .any(|w| lower.contains(w));
    let negative = ["no", "cancel", "rather not", "different"]
        .iter()
        .any(|w| lower.contains(w));

    if negative && !affirmative {
        {
            let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
                return Ok(GroupResult::halt("site_visit_missing_event"));
            };
            event.site_visit_state.reset();
        }
        ctx.state.extras.persist = true;
        let draft = Draft::new(
            7,
            "site_visit_cancelled",
            "No problem - we can set up a visit any time, just say the word.",
        )
        .with_workflow_footer("Finalize booking", "Awaiting Client");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("site_visit_declined"));
    }

    if !affirmative {
        let draft = Draft::new(
            7,
            "site_visit_confirm",
            "Just to be sure - shall I book the proposed visit slot?",
        )
        .with_workflow_footer("Confirm the visit", "Awaiting Client Response");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("site_visit_confirm_pending"));
    }

    let now_ms = ctx.state.now_ms;
    let scheduled = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("site_visit_missing_event"));
        };
        let ok = event.site_visit_state.confirm_pending();
        if ok {
            let display = event
                .site_visit_state
                .date_iso
                .clone()
                .unwrap_or_default();
            event.log_activity("site_visit_booked", display, now_ms);
        }
        ok
    };
    ctx.state.extras.persist = true;

    if !scheduled {
        return Ok(GroupResult::halt("site_visit_confirm_failed"));
    }
    let (date, slot) = match ctx.event() {
        Some(event) => (
            event.site_visit_state.date_iso.clone().unwrap_or_default(),
            event.site_visit_state.time_slot.clone().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    let draft = Draft::new(
        7,
        "site_visit_booked",
        format!(
            "Your site visit is booked for {} at {slot}. We look forward to showing you around!",
            vd_core::dates::iso_to_ddmmyyyy(&date)
        ),
    )
    .with_workflow_footer("Finalize booking", "Awaiting Client");
    ctx.state.add_draft(draft);
    ctx.set_thread_state(ThreadState::AwaitingClient);
    Ok(GroupResult::halt("site_visit_scheduled").with_payload(json!({ "date": date, "slot": slot })))
}

#[cfg(test)]
#[path = "site_visit_tests.rs"]
mod tests;
