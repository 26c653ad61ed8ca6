// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_util::Harness;
use vd_core::test_support::{event_at_offer_step, sample_offer};
use vd_core::{BillingDetails, DepositStatus, Event, Intent, UnifiedDetection};

fn event_at_confirmation(billing: bool) -> Event {
    let mut event = event_at_offer_step();
    event.current_step = 7;
    event.offers.push(sample_offer("OFR-1"));
    event.current_offer_id = Some("OFR-1".to_string());
    event.offer_accepted = true;
    if billing {
        event.billing_details = BillingDetails {
            name_or_company: Some("ACME AG".into()),
            street: Some("Bahnhofstrasse 1".into()),
            postal_code: Some("8001".into()),
            city: Some("Zurich".into()),
            country: None,
        };
    }
    event
}

fn plain(intent: Intent, confidence: f64) -> UnifiedDetection {
    UnifiedDetection::new(intent, confidence)
}

#[yare::parameterized(
    yes          = { "Yes", Classification::Confirm },
    confirm      = { "We confirm the booking", Classification::Confirm },
    deposit_paid = { "We paid the deposit yesterday", Classification::DepositPaid },
    reserve      = { "Could you hold the date for us?", Classification::Reserve },
    site_visit   = { "Could we do a site visit first?", Classification::SiteVisit },
    decline      = { "We have to cancel", Classification::Decline },
    question     = { "What's included in the price?", Classification::Question },
)]
fn classification_cases(text: &str, expected: Classification) {
    let det = plain(Intent::Qna, 0.8);
    assert_eq!(classify(text, &det), expected, "{text}");
}

#[test]
fn confirm_without_billing_hits_the_gate() {
    let mut harness = Harness::new("We confirm!", plain(Intent::ConfirmDate, 0.9))
        .with_event(event_at_confirmation(false));
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "confirmation_billing_gate");
    let event = harness.event();
    assert_eq!(event.current_step, 7);
    assert!(event.billing_requirements.awaiting_billing_for_confirmation);
    let missing = result.payload["missing_billing_fields"].as_array().unwrap();
    assert_eq!(missing.len(), 4);
}

#[test]
fn confirm_with_billing_and_no_deposit_confirms() {
    let mut harness = Harness::new("We confirm!", plain(Intent::ConfirmDate, 0.9))
        .with_event(event_at_confirmation(true));
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "confirmation_draft");
    let event = harness.event();
    assert_eq!(event.status, EventStatus::Confirmed);
    let draft = &harness.state.drafts[0];
    assert_eq!(draft.topic, "offer_confirmation");
    assert!(draft.requires_approval);
    assert!(!draft.table_blocks.is_empty());
    assert!(draft.body.contains("site visit"), "offers a visit");
}

#[test]
fn deposit_policy_blocks_until_paid() {
    let mut harness = Harness::new("We confirm!", plain(Intent::ConfirmDate, 0.9))
        .with_event(event_at_confirmation(true));
    harness.state.config.global_deposit.deposit_enabled = true;
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "confirmation_deposit_requested");
    let event = harness.event();
    assert_eq!(event.deposit_info.status, DepositStatus::Requested);
    // 30% of 2550
    assert_eq!(event.deposit_info.amount, 765.0);
    assert_ne!(event.status, EventStatus::Confirmed);
}

#[test]
fn deposit_paid_message_confirms_without_hil() {
    let mut event = event_at_confirmation(true);
    event.deposit_info.required = true;
    event.deposit_info.amount = 765.0;
    event.deposit_info.status = DepositStatus::Requested;
    let mut harness = Harness::new(
        "We paid the deposit on 02.01.2026.",
        plain(Intent::EventRequest, 0.9),
    )
    .with_event(event);
    let result = process(&mut harness.ctx()).unwrap();

    assert_ne!(result.action, "structural_change_detour");
    assert_eq!(result.action, "confirmation_draft");
    let event = harness.event();
    assert!(event.deposit_info.paid);
    assert_eq!(event.chosen_date.as_deref(), Some("15.04.2026"), "payment date never rebooks");
    assert!(!harness.state.drafts[0].requires_approval, "payment implies intent");
}

#[test]
fn deposit_just_paid_signal_bypasses_gates() {
    let mut event = event_at_confirmation(false); // billing incomplete!
    event.deposit_info.required = true;
    event.deposit_info.status = DepositStatus::Requested;
    let mut harness = Harness::new("", plain(Intent::NonEvent, 0.0)).with_event(event);
    harness.state.message.deposit_just_paid = true;
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "confirmation_draft");
    assert!(harness.event().deposit_info.paid);
    assert!(harness.state.extras.skip_hil);
}

#[test]
fn billing_continuation_sends_final_contract() {
    let mut event = event_at_confirmation(true);
    event.billing_requirements.awaiting_billing_for_confirmation = true;
    let mut harness = Harness::new(
        "Billing: ACME AG, Bahnhofstrasse 1, 8001 Zurich",
        plain(Intent::EventRequest, 0.9),
    )
    .with_event(event);
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "final_contract_ready");
    let event = harness.event();
    assert!(!event.billing_requirements.awaiting_billing_for_confirmation);
    let draft = &harness.state.drafts[0];
    assert_eq!(draft.topic, "final_contract_sent");
    assert!(draft.requires_approval);
}

#[test]
fn bare_new_date_detours_structurally() {
    let mut det = plain(Intent::EventRequest, 0.9);
    det.entities.date_text = Some("22.04.2026".into());
    let mut harness = Harness::new("Actually 22.04.2026 suits us better", det)
        .with_event(event_at_confirmation(true));
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "structural_change_detour");
    let event = harness.event();
    assert_eq!(event.current_step, 2);
    assert_eq!(event.caller_step, Some(7));
}

#[test]
fn reserve_requests_a_deposit_option() {
    let mut harness = Harness::new(
        "Please hold the date for us for now",
        plain(Intent::EventRequest, 0.8),
    )
    .with_event(event_at_confirmation(true));
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "confirmation_reserve");
    assert_eq!(harness.event().deposit_info.status, DepositStatus::Requested);
    assert!(harness.state.drafts[0].body.contains("reserved"));
}

#[test]
fn decline_cancels_and_closes() {
    let mut harness = Harness::new("We have to cancel.", plain(Intent::Cancellation, 0.9))
        .with_event(event_at_confirmation(true));
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "confirmation_decline");
    let event = harness.event();
    assert_eq!(event.status, EventStatus::Cancelled);
    assert_eq!(event.thread_state, ThreadState::Closed);
}

#[test]
fn hil_continuation_finalizes_and_offers_site_visit() {
    let mut event = event_at_confirmation(true);
    event.confirmation_state.pending = Some(ConfirmationPending::new("final_confirmation"));
    let mut harness = Harness::new("ignored", plain(Intent::NonEvent, 0.0)).with_event(event);
    harness.state.message = vd_core::IncomingMessage::continuation(
        "hil-cont",
        "client@example.com",
        "2026-01-01T00:00:00Z",
    );
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "site_visit_dates_proposed");
    let event = harness.event();
    assert_eq!(event.status, EventStatus::Confirmed);
    assert!(event.confirmation_state.pending.is_none());
    assert!(event.site_visit_state.is_active());
}

#[test]
fn site_visit_request_starts_the_flow() {
    let mut harness = Harness::new(
        "Could we do a site visit first?",
        plain(Intent::Qna, 0.8),
    )
    .with_event(event_at_confirmation(true));
    let result = process(&mut harness.ctx()).unwrap();

    assert_eq!(result.action, "site_visit_dates_proposed");
    assert!(harness.event().site_visit_state.is_active());
}
