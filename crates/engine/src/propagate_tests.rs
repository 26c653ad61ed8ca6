// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vd_core::test_support::event_at_offer_step;
use vd_core::{Intent, Signals};

fn detection_with(entities: Entities, signals: Signals) -> UnifiedDetection {
    let mut det = UnifiedDetection::new(Intent::ChangeRequest, 0.9);
    det.entities = entities;
    det.signals = signals;
    det
}

fn change_signals() -> Signals {
    Signals { is_change_request: true, ..Default::default() }
}

#[test]
fn date_change_detected_with_dual_condition() {
    let event = event_at_offer_step();
    let text = "Can we move the date to 22.04.2026?";
    let det = detection_with(
        Entities { date_text: Some("22.04.2026".into()), ..Default::default() },
        change_signals(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(detect_change(&event, &det, text, &ctx), Some(ChangeType::Date));
}

#[test]
fn same_date_is_not_a_change() {
    let event = event_at_offer_step();
    let text = "Can we keep the date 15.04.2026? change nothing else on the date";
    let det = detection_with(
        Entities { date_text: Some("15.04.2026".into()), ..Default::default() },
        change_signals(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert_ne!(detect_change(&event, &det, text, &ctx), Some(ChangeType::Date));
}

#[test]
fn pure_question_never_detours() {
    let event = event_at_offer_step();
    let text = "What if we changed the date?";
    let mut det = detection_with(
        Entities { date_text: Some("22.04.2026".into()), ..Default::default() },
        Signals { is_question: true, ..Default::default() },
    );
    det.intent = Intent::Qna;
    let ctx = build_change_context(&event, &det, text);
    assert!(ctx.qna_no_change);
    assert_eq!(detect_change(&event, &det, text, &ctx), None);
}

#[test]
fn deposit_payment_date_is_guarded() {
    let mut event = event_at_offer_step();
    event.current_step = 7;
    let text = "We paid the deposit on 02.01.2026.";
    let det = detection_with(
        Entities { date_text: Some("02.01.2026".into()), ..Default::default() },
        Signals::default(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert!(ctx.deposit_date_context);
    assert_eq!(detect_change(&event, &det, text, &ctx), None);
    assert_eq!(detect_structural_change(&event, &det, text, &ctx), None);
}

#[test]
fn site_visit_dates_bind_to_the_visit() {
    let mut event = event_at_offer_step();
    event.site_visit_state.start_flow(7, vec!["2026-04-20".into()]);
    let text = "Let's change it to 20.04.2026 then";
    let det = detection_with(
        Entities { date_text: Some("20.04.2026".into()), ..Default::default() },
        change_signals(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(detect_change(&event, &det, text, &ctx), None);

    // Explicit event-date mention overrides the guard
    let text = "Please change the event date to 20.04.2026";
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(detect_change(&event, &det, text, &ctx), Some(ChangeType::Date));
}

#[test]
fn billing_flow_suppresses_all_changes() {
    let mut event = event_at_offer_step();
    event.billing_requirements.awaiting_billing_for_accept = true;
    let text = "Move the date to 22.04.2026";
    let det = detection_with(
        Entities { date_text: Some("22.04.2026".into()), ..Default::default() },
        change_signals(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(detect_change(&event, &det, text, &ctx), None);
}

#[test]
fn explicit_site_visit_change_wins() {
    let event = event_at_offer_step();
    let text = "Can we reschedule our site visit to Monday?";
    let det = detection_with(Entities::default(), change_signals());
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(detect_change(&event, &det, text, &ctx), Some(ChangeType::SiteVisit));
}

#[test]
fn billing_address_is_client_info_without_detour() {
    let event = event_at_offer_step();
    let text = "Billing: ACME AG, Bahnhofstrasse 1, 8001 Zurich";
    let det = detection_with(
        Entities { billing_address: Some("ACME AG, Bahnhofstrasse 1, 8001 Zurich".into()), ..Default::default() },
        Signals::default(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(detect_change(&event, &det, text, &ctx), Some(ChangeType::ClientInfo));
    let decision = route_change(&event, ChangeType::ClientInfo, 4);
    assert!(!decision.needs_reeval);
}

#[test]
fn requirements_hash_match_skips_reeval() {
    let event = event_at_offer_step();
    let decision = route_change(&event, ChangeType::Requirements, 4);
    assert!(!decision.needs_reeval);
    assert_eq!(decision.skip_reason.as_deref(), Some("hash_match"));
}

#[test]
fn requirements_drift_routes_to_step_3() {
    let mut event = event_at_offer_step();
    event.requirements.number_of_participants = Some(80);
    event.requirements_hash =
        Some(vd_core::requirements::requirements_hash(&event.requirements));
    let decision = route_change(&event, ChangeType::Requirements, 4);
    assert!(decision.needs_reeval);
    assert_eq!(decision.next_step, 3);
    assert_eq!(decision.caller_step, Some(4));
}

#[test]
fn composed_detour_preserves_innermost_caller() {
    let mut event = event_at_offer_step();
    event.current_step = 2;
    event.caller_step = Some(4);
    let decision = route_change(&event, ChangeType::Date, 2);
    assert_eq!(decision.caller_step, Some(4), "innermost caller survives");
}

#[test]
fn forward_owner_records_no_caller() {
    let mut event = event_at_offer_step();
    event.current_step = 5;
    let decision = route_change(&event, ChangeType::Deposit, 5);
    assert_eq!(decision.next_step, 7);
    assert_eq!(decision.caller_step, None);
}

#[test]
fn structural_check_catches_bare_new_date() {
    let mut event = event_at_offer_step();
    event.current_step = 7;
    let text = "Actually 22.04.2026 works better for us.";
    let det = detection_with(
        Entities { date_text: Some("22.04.2026".into()), ..Default::default() },
        Signals::default(),
    );
    let ctx = build_change_context(&event, &det, text);
    assert_eq!(
        detect_structural_change(&event, &det, text, &ctx),
        Some((2, "confirmation_changed_date"))
    );
}

#[test]
fn structural_check_participants_and_products() {
    let event = event_at_offer_step();
    let det = detection_with(
        Entities { participants: Some(45), ..Default::default() },
        Signals::default(),
    );
    let ctx = ChangeContext::default();
    assert_eq!(
        detect_structural_change(&event, &det, "45 people now", &ctx),
        Some((3, "confirmation_changed_participants"))
    );

    let det = detection_with(
        Entities { products_add: vec!["Projector".into()], ..Default::default() },
        Signals::default(),
    );
    assert_eq!(
        detect_structural_change(&event, &det, "please add Projector", &ctx),
        Some((4, "confirmation_changed_products"))
    );
}

#[test]
fn resolve_restores_caller() {
    let mut event = event_at_offer_step();
    event.current_step = 2;
    event.caller_step = Some(4);
    assert!(resolve_detour(&mut event, 10));
    assert_eq!(event.current_step, 4);
    assert_eq!(event.caller_step, None);

    assert!(!resolve_detour(&mut event, 11), "no-op without active detour");
}
