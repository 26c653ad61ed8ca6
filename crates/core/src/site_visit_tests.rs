// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn full_flow_to_scheduled() {
    let mut state = SiteVisitState::default();
    assert!(!state.is_active());

    state.start_flow(7, vec!["2026-01-19".into(), "2026-01-20".into()]);
    assert_eq!(state.status, SiteVisitStatus::DatePending);
    assert!(state.is_active());
    assert_eq!(state.initiated_at_step, Some(7));

    state.set_time_pending("2026-01-20", vec!["10:00".into(), "14:00".into()]);
    assert_eq!(state.status, SiteVisitStatus::TimePending);
    assert_eq!(state.selected_date.as_deref(), Some("2026-01-20"));

    state.set_pending_confirmation("2026-01-20 at 10:00");
    assert_eq!(state.status, SiteVisitStatus::ConfirmPending);

    assert!(state.confirm_pending());
    assert_eq!(state.status, SiteVisitStatus::Scheduled);
    assert!(state.is_scheduled());
    assert_eq!(state.date_iso.as_deref(), Some("2026-01-20"));
    assert_eq!(state.time_slot.as_deref(), Some("10:00"));
    assert!(state.pending_slot.is_none());
}

#[test]
fn confirm_without_pending_slot_fails() {
    let mut state = SiteVisitState::default();
    assert!(!state.confirm_pending());

    state.status = SiteVisitStatus::ConfirmPending;
    assert!(!state.confirm_pending());
}

#[test]
fn confirm_accepts_dotted_dates() {
    let mut state = SiteVisitState::default();
    state.set_pending_confirmation("20.01.2026 at 14:00");
    assert!(state.confirm_pending());
    assert_eq!(state.date_iso.as_deref(), Some("2026-01-20"));
    assert_eq!(state.time_slot.as_deref(), Some("14:00"));
}

#[test]
fn reset_clears_everything() {
    let mut state = SiteVisitState::default();
    state.start_flow(5, vec!["2026-01-19".into()]);
    state.set_time_pending("2026-01-19", vec!["10:00".into()]);
    state.reset();
    assert_eq!(state, SiteVisitState::default());
}

#[test]
fn legacy_room_id_reads_but_never_writes() {
    let json = r#"{"status":"scheduled","date_iso":"2026-01-20","room_id":"Room A"}"#;
    let state: SiteVisitState = serde_json::from_str(json).unwrap();
    assert_eq!(state.room_id.as_deref(), Some("Room A"));

    let mut fresh = SiteVisitState::default();
    fresh.schedule("2026-01-20", Some("10:00".into()));
    let out = serde_json::to_string(&fresh).unwrap();
    assert!(!out.contains("room_id"));
}

#[yare::parameterized(
    explicit_change     = { "Can we reschedule our site visit?", true },
    tour_move           = { "please move the tour to 14:00", true },
    german              = { "Besichtigung verschieben? different day", true },
    event_date_change   = { "change the date to March 15", false },
    plain_visit_wish    = { "I'd like to visit on Monday", false },
    confirm_visit       = { "confirm the visit", false },
)]
fn change_request_detection(text: &str, expected: bool) {
    assert_eq!(is_site_visit_change_request(text), expected, "{text}");
}
