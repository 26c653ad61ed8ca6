// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-message detection result types.
//!
//! One detection pass produces everything the router needs from a message:
//! intent, confidence, language, signal flags, and extracted entities.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Classified intent of a single inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    EventRequest,
    ConfirmDate,
    AcceptOffer,
    DeclineOffer,
    ChangeRequest,
    Qna,
    NonEvent,
    Cancellation,
    ManagerRequest,
}

crate::simple_display! {
    Intent {
        EventRequest => "event_request",
        ConfirmDate => "confirm_date",
        AcceptOffer => "accept_offer",
        DeclineOffer => "decline_offer",
        ChangeRequest => "change_request",
        Qna => "qna",
        NonEvent => "non_event",
        Cancellation => "cancellation",
        ManagerRequest => "manager_request",
    }
}

impl Intent {
    /// Whether this intent advances the booking workflow (as opposed to
    /// side conversations).
    pub fn is_event_related(&self) -> bool {
        !matches!(self, Intent::NonEvent | Intent::ManagerRequest)
    }
}

/// Detected message language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
    It,
    Es,
    Mixed,
}

crate::simple_display! {
    Language {
        En => "en",
        De => "de",
        Fr => "fr",
        It => "it",
        Es => "es",
        Mixed => "mixed",
    }
}

/// Boolean signal flags extracted alongside the intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signals {
    pub is_confirmation: bool,
    pub is_acceptance: bool,
    pub is_rejection: bool,
    pub is_change_request: bool,
    pub is_manager_request: bool,
    pub is_question: bool,
    pub has_urgency: bool,
}

/// Structured entities extracted from one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_iso: Option<String>,
    /// Date as written by the client (DD.MM.YYYY).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_preference: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products_add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products_remove: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_choice: Option<String>,
}

impl Entities {
    /// True when no entity was extracted at all.
    pub fn is_empty(&self) -> bool {
        self == &Entities::default()
    }
}

/// Result of one detection pass over a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedDetection {
    pub intent: Intent,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub signals: Signals,
    #[serde(default)]
    pub entities: Entities,
    /// Q&A sub-topics present in the message (e.g. "parking", "catering").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qna_types: Vec<SmolStr>,
    /// Step the message explicitly anchors to, when the client references one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_anchor: Option<u8>,
}

impl UnifiedDetection {
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence,
            language: Language::default(),
            signals: Signals::default(),
            entities: Entities::default(),
            qna_types: Vec::new(),
            step_anchor: None,
        }
    }

    /// Q&A guard used by change detection: the message is a question and the
    /// classifier did not flag an actual change request.
    pub fn is_pure_question(&self) -> bool {
        (self.signals.is_question || !self.qna_types.is_empty()) && !self.signals.is_change_request
    }
}

#[cfg(test)]
#[path = "detection_tests.rs"]
mod tests;
