// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_util::Harness;
use vd_core::{Event, Intent, UnifiedDetection};

fn event_awaiting_date() -> Event {
    let mut event = Event::new("client@example.com", "thread-1", 0);
    event.current_step = 2;
    event.requirements.number_of_participants = Some(30);
    event
}

fn detection_with_date(date: &str) -> UnifiedDetection {
    let mut det = UnifiedDetection::new(Intent::ConfirmDate, 0.9);
    det.entities.date_text = Some(date.to_string());
    det.signals.is_confirmation = true;
    det
}

#[test]
fn valid_date_confirms_and_chains_to_rooms() {
    let mut harness = Harness::new(
        "We confirm the date 12.05.2026",
        detection_with_date("12.05.2026"),
    )
    .with_event(event_awaiting_date());
    let result = process(&mut harness.ctx()).unwrap();

    let event = harness.event();
    assert!(event.date_confirmed);
    assert_eq!(event.chosen_date.as_deref(), Some("12.05.2026"));
    assert_eq!(event.status, EventStatus::DateConfirmed);
    assert_eq!(event.current_step, 3);
    // Chained into room evaluation: reply already proposes rooms
    assert!(result.action.starts_with("room_"), "{}", result.action);
}

#[test]
fn past_date_is_rejected_with_alternatives() {
    let mut harness = Harness::new(
        "How about 12.05.2020?",
        detection_with_date("12.05.2020"),
    )
    .with_event(event_awaiting_date());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "date_rejected_past");
    let event = harness.event();
    assert!(!event.date_confirmed);
    assert_eq!(event.current_step, 2);
    assert!(harness.state.drafts[0].body.contains("calendar") || !harness.state.drafts.is_empty());
}

#[test]
fn day_month_without_year_resolves_against_message_year() {
    let det = UnifiedDetection::new(Intent::ConfirmDate, 0.9);
    let mut harness =
        Harness::new("Would the 15.06. work for us?", det).with_event(event_awaiting_date());
    let result = process(&mut harness.ctx()).unwrap();

    // Message ts is 2026; 15.06.2026 is in the future and confirms.
    assert!(result.action.starts_with("room_"), "{}", result.action);
    assert_eq!(harness.event().chosen_date.as_deref(), Some("15.06.2026"));
    assert!(harness.event().date_confirmed);
}

#[test]
fn missing_date_proposes_candidates() {
    let det = UnifiedDetection::new(Intent::EventRequest, 0.9);
    let mut harness =
        Harness::new("Sometime next spring would be lovely", det).with_event(event_awaiting_date());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "date_options_proposed");
    assert_eq!(harness.event().thread_state, ThreadState::AwaitingClientResponse);
    let candidates = result.payload["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 3);
}

#[test]
fn reconfirming_same_date_is_a_noop() {
    let mut event = event_awaiting_date();
    event.chosen_date = Some("12.05.2026".to_string());
    event.date_confirmed = true;
    let mut harness = Harness::new(
        "Just confirming again: 12.05.2026",
        detection_with_date("12.05.2026"),
    )
    .with_event(event);
    let before = harness.event().fingerprint();
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "date_reconfirmed");
    assert_eq!(harness.event().current_step, 2);
    assert_eq!(harness.event().fingerprint(), before, "no state delta");
}

#[test]
fn detour_resolution_restores_caller() {
    let mut event = event_awaiting_date();
    event.caller_step = Some(5);
    let mut harness = Harness::new(
        "Let's lock in 12.05.2026",
        detection_with_date("12.05.2026"),
    )
    .with_event(event);
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "date_confirmed");
    let event = harness.event();
    assert_eq!(event.current_step, 5, "caller restored");
    assert!(event.caller_step.is_none());
}

#[test]
fn same_cycle_change_detour_asks_for_confirmation() {
    let mut event = event_awaiting_date();
    event.caller_step = Some(4);
    event.chosen_date = Some("22.04.2026".to_string());
    let mut harness = Harness::new(
        "Can we move the date to 22.04.2026?",
        detection_with_date("22.04.2026"),
    )
    .with_event(event);
    harness.state.extras.change_detour = true;
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "date_change_pending_confirmation");
    let event = harness.event();
    assert!(!event.date_confirmed, "new date awaits explicit confirmation");
    assert_eq!(event.current_step, 2);
    assert_eq!(event.caller_step, Some(4));
}
