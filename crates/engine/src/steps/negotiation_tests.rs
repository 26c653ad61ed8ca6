// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_util::Harness;
use vd_core::test_support::{event_at_offer_step, sample_offer};
use vd_core::{Event, Signals, UnifiedDetection};

fn event_at_negotiation() -> Event {
    let mut event = event_at_offer_step();
    event.current_step = 5;
    event.offers.push(sample_offer("OFR-1"));
    event.current_offer_id = Some("OFR-1".to_string());
    event
}

fn accept_detection() -> UnifiedDetection {
    let mut det = UnifiedDetection::new(Intent::AcceptOffer, 0.95);
    det.signals = Signals { is_acceptance: true, ..Default::default() };
    det
}

#[test]
fn acceptance_without_billing_halts_for_billing() {
    let mut harness =
        Harness::new("We accept the offer.", accept_detection()).with_event(event_at_negotiation());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "offer_accept_pending_billing");
    assert!(result.halt);
    let event = harness.event();
    assert_eq!(event.current_step, 5);
    assert!(event.offer_accepted);
    assert!(event.billing_requirements.awaiting_billing_for_accept);
    assert_eq!(event.status, EventStatus::Accepted);
    let body = &harness.state.drafts[0].body;
    for needle in ["name or company", "street", "postal code", "city"] {
        assert!(body.contains(needle), "draft must ask for {needle}");
    }
}

fn complete_billing(event: &mut Event) {
    event.billing_details = vd_core::BillingDetails {
        name_or_company: Some("ACME AG".into()),
        street: Some("Bahnhofstrasse 1".into()),
        postal_code: Some("8001".into()),
        city: Some("Zurich".into()),
        country: Some("Switzerland".into()),
    };
}

#[test]
fn acceptance_with_billing_moves_to_transition() {
    let mut event = event_at_negotiation();
    complete_billing(&mut event);
    let mut harness = Harness::new("We accept the offer.", accept_detection()).with_event(event);
    let result = process(&mut harness.ctx()).unwrap();

    // Transition ran in the same cycle (HIL off advances to 7)
    assert_eq!(result.action, "transition_ready");
    assert_eq!(harness.event().current_step, 7);
}

#[test]
fn billing_continuation_resumes_acceptance() {
    let mut event = event_at_negotiation();
    event.offer_accepted = true;
    event.billing_requirements.awaiting_billing_for_accept = true;
    complete_billing(&mut event);
    let det = UnifiedDetection::new(Intent::EventRequest, 0.9);
    let mut harness = Harness::new("Here are our billing details", det).with_event(event);
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "transition_ready");
    let event = harness.event();
    assert!(!event.billing_requirements.awaiting_billing_for_accept);
    assert_eq!(event.current_step, 7);
}

#[test]
fn quoted_history_date_does_not_detour() {
    let det = UnifiedDetection::new(Intent::Qna, 0.6);
    let mut event = event_at_negotiation();
    event.chosen_date = Some("12.05.2026".to_string());
    // The body as seen by handlers is already history-stripped; entities
    // carry no date because the only date was quoted.
    let mut harness = Harness::new(
        "Thanks!\n\nOn Tue, 14.02.2026 you wrote:\n> Event Date: 14.02.2026\n",
        det,
    )
    .with_event(event);
    let result = process(&mut harness.ctx()).unwrap();

    assert_ne!(result.action, "structural_change_detour");
    assert_eq!(harness.event().chosen_date.as_deref(), Some("12.05.2026"));
}

#[test]
fn explicit_discount_produces_revised_offer() {
    let det = UnifiedDetection::new(Intent::ChangeRequest, 0.8);
    let mut harness = Harness::new("Could you do 10% off the price?", det)
        .with_event(event_at_negotiation());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "offer_revised");
    let event = harness.event();
    assert_eq!(event.offers.len(), 2);
    assert_eq!(event.current_offer_id.as_deref(), Some("OFR-2"));
    let revised = event.current_offer().unwrap();
    assert_eq!(revised.total_amount, 2550.0 * 0.9);
    assert_eq!(event.offer_status.as_deref(), Some("Revised"));
}

#[test]
fn vague_counter_goes_to_the_team() {
    let det = UnifiedDetection::new(Intent::ChangeRequest, 0.8);
    let mut harness = Harness::new("That price is above our budget.", det)
        .with_event(event_at_negotiation());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "negotiation_counter_queued");
    assert_eq!(harness.db.tasks.len(), 1);
    assert_eq!(harness.db.tasks[0].kind, TaskType::NegotiationDecision);
}

#[test]
fn structural_date_change_detours_to_date_step() {
    let mut det = UnifiedDetection::new(Intent::ChangeRequest, 0.9);
    det.signals.is_change_request = true;
    det.entities.date_text = Some("22.04.2026".into());
    let mut harness = Harness::new("We need to move to 22.04.2026", det)
        .with_event(event_at_negotiation());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "structural_change_detour");
    let event = harness.event();
    assert_eq!(event.current_step, 2);
    assert_eq!(event.caller_step, Some(5));
}

#[test]
fn decline_keeps_the_conversation_open() {
    let mut det = UnifiedDetection::new(Intent::DeclineOffer, 0.9);
    det.signals.is_rejection = true;
    let mut harness =
        Harness::new("We decline the offer, sorry.", det).with_event(event_at_negotiation());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "offer_declined");
    assert_eq!(harness.event().offer_status.as_deref(), Some("Declined"));
    assert_ne!(harness.event().status, EventStatus::Cancelled);
}

#[test]
fn cancellation_closes_the_thread() {
    let det = UnifiedDetection::new(Intent::Cancellation, 0.92);
    let mut harness = Harness::new("Please cancel our booking entirely.", det)
        .with_event(event_at_negotiation());
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "event_cancelled");
    let event = harness.event();
    assert_eq!(event.status, EventStatus::Cancelled);
    assert_eq!(event.thread_state, ThreadState::Closed);
}
