// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-in-the-loop task queue entries.

use crate::draft::Draft;
use crate::id::{EventId, TaskId};
use serde::{Deserialize, Serialize};

/// What kind of review the task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ManualReview,
    ConfirmationMessage,
    TransitionMessage,
    OfferDraft,
    NegotiationDecision,
}

crate::simple_display! {
    TaskType {
        ManualReview => "manual_review",
        ConfirmationMessage => "confirmation_message",
        TransitionMessage => "transition_message",
        OfferDraft => "offer_draft",
        NegotiationDecision => "negotiation_decision",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Approved,
    Rejected,
    Edited,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Edited => "edited",
    }
}

/// A draft (or a whole message) awaiting manager review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskType,
    /// Draft held back from sending, when the task gates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
    /// Free-form context (subject, snippet, reason) for manual reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
    /// Send metadata recorded on approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at_ms: Option<u64>,
}

impl Task {
    pub fn new(kind: TaskType, created_at_ms: u64) -> Self {
        Self {
            task_id: TaskId::generate(),
            event_id: None,
            client_id: None,
            kind,
            draft: None,
            context: None,
            status: TaskStatus::Pending,
            created_at_ms,
            resolved_at_ms: None,
            sent_body: None,
            sent_at_ms: None,
        }
    }

    crate::setters! {
        option {
            event_id: EventId,
            client_id: String,
            draft: Draft,
            context: String,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Resolve as approved, recording what was actually sent.
    pub fn approve(&mut self, sent_body: String, now_ms: u64, edited: bool) {
        self.status = if edited { TaskStatus::Edited } else { TaskStatus::Approved };
        self.resolved_at_ms = Some(now_ms);
        self.sent_body = Some(sent_body);
        self.sent_at_ms = Some(now_ms);
    }

    pub fn reject(&mut self, now_ms: u64) {
        self.status = TaskStatus::Rejected;
        self.resolved_at_ms = Some(now_ms);
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
