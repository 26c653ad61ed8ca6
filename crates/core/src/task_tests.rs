// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_task_is_pending() {
    let task = Task::new(TaskType::ManualReview, 1_000);
    assert!(task.is_pending());
    assert!(task.task_id.as_str().starts_with("tsk-"));
}

#[test]
fn approve_records_send_metadata() {
    let mut task = Task::new(TaskType::OfferDraft, 1_000)
        .event_id(EventId::from_string("evt-1"))
        .draft(Draft::new(4, "offer_sent", "Offer body"));
    task.approve("Offer body".to_string(), 2_000, false);
    assert_eq!(task.status, TaskStatus::Approved);
    assert_eq!(task.sent_at_ms, Some(2_000));
    assert_eq!(task.sent_body.as_deref(), Some("Offer body"));
}

#[test]
fn edited_approval_keeps_edited_status() {
    let mut task = Task::new(TaskType::ConfirmationMessage, 1_000);
    task.approve("Adjusted body".to_string(), 2_000, true);
    assert_eq!(task.status, TaskStatus::Edited);
}

#[test]
fn reject_resolves_without_send() {
    let mut task = Task::new(TaskType::TransitionMessage, 1_000);
    task.reject(3_000);
    assert_eq!(task.status, TaskStatus::Rejected);
    assert_eq!(task.resolved_at_ms, Some(3_000));
    assert!(task.sent_at_ms.is_none());
}

#[test]
fn task_type_serializes_as_type() {
    let task = Task::new(TaskType::NegotiationDecision, 1_000);
    let json = serde_json::to_string(&task).unwrap();
    assert!(json.contains("\"type\":\"negotiation_decision\""));
}
