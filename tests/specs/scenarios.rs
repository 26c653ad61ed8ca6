// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Literal end-to-end scenarios S1-S5.

use crate::support::{db_path, engine, msg, read_event, seed_event};
use vd_core::requirements::{requirements_hash, Requirements, TimeWindow};
use vd_core::test_support::sample_offer;
use vd_core::{DepositStatus, EventStatus};

fn locked_requirements() -> Requirements {
    Requirements {
        number_of_participants: Some(30),
        duration: Some(TimeWindow { start: "14:00".into(), end: "16:00".into() }),
        seating_layout: None,
        special_requirements: None,
        preferred_room: Some("Room A".into()),
    }
}

/// S1 — happy path intake + shortcut.
#[tokio::test]
async fn s1_happy_path_intake_and_shortcut() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let message = msg("m1", "We'd like Room A on 15.04.2026 for 30 guests, 14:00-16:00");

    let outcome = engine().process_msg(message, &path).await;

    assert_eq!(outcome.action, "smart_shortcut_to_offer");
    assert_eq!(outcome.current_step, 4);
    let event = read_event(&path);
    assert_eq!(event.locked_room_id.as_deref(), Some("Room A"));
    assert_eq!(event.chosen_date.as_deref(), Some("15.04.2026"));
    assert_eq!(event.requirements.number_of_participants, Some(30));
}

/// S2 — date change after room lock.
#[tokio::test]
async fn s2_date_change_after_room_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    seed_event(&path, |event| {
        let requirements = locked_requirements();
        let hash = requirements_hash(&requirements);
        event.current_step = 4;
        event.chosen_date = Some("15.04.2026".to_string());
        event.date_confirmed = true;
        event.locked_room_id = Some("Room A".to_string());
        event.requirements = requirements;
        event.requirements_hash = Some(hash.clone());
        event.room_eval_hash = Some(hash);
    });

    let outcome = engine()
        .process_msg(msg("m2", "Can we move the date to 22.04.2026?"), &path)
        .await;

    assert_eq!(outcome.action, "change_detour");
    let event = read_event(&path);
    assert_eq!(event.current_step, 2);
    assert_eq!(event.caller_step, Some(4));
    assert_eq!(event.locked_room_id, None);
    assert_eq!(event.room_eval_hash, None);
    assert!(!event.date_confirmed);
}

/// S3 — quoted confirmation must not trigger change.
#[tokio::test]
async fn s3_quoted_confirmation_is_inert() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    seed_event(&path, |event| {
        let requirements = locked_requirements();
        let hash = requirements_hash(&requirements);
        event.current_step = 5;
        event.chosen_date = Some("12.05.2026".to_string());
        event.date_confirmed = true;
        event.locked_room_id = Some("Room A".to_string());
        event.requirements = requirements;
        event.requirements_hash = Some(hash.clone());
        event.room_eval_hash = Some(hash);
        event.offers.push(sample_offer("OFR-1"));
        event.current_offer_id = Some("OFR-1".to_string());
    });

    let outcome = engine()
        .process_msg(
            msg("m3", "Thanks!\n\nOn Tue, 14.02.2026 you wrote:\n> Event Date: 14.02.2026\n"),
            &path,
        )
        .await;

    assert_ne!(outcome.action, "structural_change_detour");
    assert_eq!(read_event(&path).chosen_date.as_deref(), Some("12.05.2026"));
}

/// S4 — offer acceptance with billing missing.
#[tokio::test]
async fn s4_acceptance_waits_for_billing() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    seed_event(&path, |event| {
        let requirements = locked_requirements();
        let hash = requirements_hash(&requirements);
        event.current_step = 5;
        event.chosen_date = Some("15.04.2026".to_string());
        event.date_confirmed = true;
        event.locked_room_id = Some("Room A".to_string());
        event.requirements = requirements;
        event.requirements_hash = Some(hash.clone());
        event.room_eval_hash = Some(hash);
        event.offers.push(sample_offer("OFR-1"));
        event.current_offer_id = Some("OFR-1".to_string());
    });

    let outcome = engine().process_msg(msg("m4", "We accept the offer."), &path).await;

    assert_eq!(outcome.action, "offer_accept_pending_billing");
    let event = read_event(&path);
    assert!(event.billing_requirements.awaiting_billing_for_accept);
    assert_eq!(event.current_step, 5);
    assert_eq!(event.status, EventStatus::Accepted);
    let body = &outcome.draft_messages[0].body;
    for needle in ["name or company", "street", "postal code", "city"] {
        assert!(body.contains(needle), "billing request must ask for {needle}");
    }
}

/// S5 — deposit-payment date must not detour.
#[tokio::test]
async fn s5_deposit_payment_date_does_not_detour() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    seed_event(&path, |event| {
        let requirements = locked_requirements();
        let hash = requirements_hash(&requirements);
        event.current_step = 7;
        event.chosen_date = Some("12.05.2026".to_string());
        event.date_confirmed = true;
        event.locked_room_id = Some("Room A".to_string());
        event.requirements = requirements;
        event.requirements_hash = Some(hash.clone());
        event.room_eval_hash = Some(hash);
        event.offers.push(sample_offer("OFR-1"));
        event.current_offer_id = Some("OFR-1".to_string());
        event.offer_accepted = true;
        event.billing_details = vd_core::BillingDetails {
            name_or_company: Some("ACME AG".into()),
            street: Some("Bahnhofstrasse 1".into()),
            postal_code: Some("8001".into()),
            city: Some("Zurich".into()),
            country: None,
        };
        event.deposit_info.required = true;
        event.deposit_info.amount = 765.0;
        event.deposit_info.status = DepositStatus::Requested;
    });

    let outcome = engine()
        .process_msg(msg("m5", "We paid the deposit on 02.01.2026."), &path)
        .await;

    assert_ne!(outcome.action, "structural_change_detour");
    let event = read_event(&path);
    assert_eq!(event.chosen_date.as_deref(), Some("12.05.2026"));
    assert!(event.deposit_info.paid);
    assert_eq!(event.deposit_info.status, DepositStatus::Paid);
}
