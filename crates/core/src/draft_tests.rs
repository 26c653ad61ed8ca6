// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn explicit_approval_always_gates() {
    let draft = Draft::new(4, "offer_sent", "Here is your offer.").requires_approval(true);
    assert!(draft.needs_hil(false));
    assert!(draft.needs_hil(true));
}

#[yare::parameterized(
    offer_sent     = { "offer_sent" },
    offer_confirm  = { "offer_confirmation" },
    transition     = { "transition_message" },
    final_contract = { "final_contract_sent" },
)]
fn gated_topics_require_hil_when_toggle_on(topic: &str) {
    let draft = Draft::new(4, topic, "body");
    assert!(!draft.needs_hil(false));
    assert!(draft.needs_hil(true));
}

#[test]
fn routine_topics_skip_hil() {
    let draft = Draft::new(7, "confirmation_question", "Happy to help.");
    assert!(!draft.needs_hil(true));
}

#[test]
fn footer_names_step_and_state() {
    let draft = Draft::new(2, "date_options", "How about these dates?")
        .with_workflow_footer("Confirm a date", "Awaiting Client Response");
    let footer = draft.footer.unwrap();
    assert!(footer.contains("Step 2"));
    assert!(footer.contains("Awaiting Client Response"));
}

#[test]
fn serde_skips_empty_collections() {
    let draft = Draft::new(1, "manual_review", "A team member will review this.");
    let json = serde_json::to_string(&draft).unwrap();
    assert!(!json.contains("table_blocks"));
    assert!(!json.contains("body_markdown"));
}

#[test]
fn field_value_table_shape() {
    let table = TableBlock::field_value(vec![
        ("Event Date", "15.04.2026".to_string()),
        ("Room", "Room A".to_string()),
    ]);
    assert_eq!(table.header, vec!["Field", "Value"]);
    assert_eq!(table.rows[1], vec!["Room", "Room A"]);
}
