// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event record — one per (client, conversation thread) — and the Client
//! profile it belongs to.

use crate::billing::{BillingDetails, BillingRequirements, DepositInfo};
use crate::id::EventId;
use crate::offer::Offer;
use crate::requirements::{requirements_hash, Requirements};
use crate::site_visit::SiteVisitState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;
use thiserror::Error;

/// Conversation-level state shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThreadState {
    #[default]
    #[serde(rename = "Awaiting Client")]
    AwaitingClient,
    #[serde(rename = "Awaiting Client Response")]
    AwaitingClientResponse,
    #[serde(rename = "Waiting on HIL")]
    WaitingOnHil,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Closed")]
    Closed,
    #[serde(rename = "Confirmed")]
    Confirmed,
}

crate::simple_display! {
    ThreadState {
        AwaitingClient => "Awaiting Client",
        AwaitingClientResponse => "Awaiting Client Response",
        WaitingOnHil => "Waiting on HIL",
        InProgress => "In Progress",
        Closed => "Closed",
        Confirmed => "Confirmed",
    }
}

/// Commercial status of the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventStatus {
    #[default]
    Lead,
    #[serde(rename = "Date Confirmed")]
    DateConfirmed,
    #[serde(rename = "Offer Sent")]
    OfferSent,
    Accepted,
    Confirmed,
    Cancelled,
}

crate::simple_display! {
    EventStatus {
        Lead => "Lead",
        DateConfirmed => "Date Confirmed",
        OfferSent => "Offer Sent",
        Accepted => "Accepted",
        Confirmed => "Confirmed",
        Cancelled => "Cancelled",
    }
}

/// Step-transition breadcrumb written whenever `current_step` or
/// `caller_step` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub from_step: u8,
    pub to_step: u8,
    pub reason: SmolStr,
    pub ts_ms: u64,
}

/// Manager-visible activity line (confirmations, cancellations, visits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: SmolStr,
    pub detail: String,
    pub ts_ms: u64,
}

/// A confirmation held open at step 7: "final_confirmation",
/// "deposit_request", "reserve_notification", "decline".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPending {
    pub kind: SmolStr,
}

impl ConfirmationPending {
    pub fn new(kind: &str) -> Self {
        Self { kind: SmolStr::new(kind) }
    }
}

/// What step 7 is waiting on, if anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<ConfirmationPending>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_response_type: Option<SmolStr>,
}

/// Persisted record of an out-of-hours warning. Warns, never blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeValidation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// One booking event, owned by a conversation thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub event_id: EventId,
    /// Lowercase client email.
    pub client_id: String,
    pub thread_id: String,
    pub current_step: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_step: Option<u8>,
    pub thread_state: ThreadState,
    pub status: EventStatus,
    pub requirements: Requirements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_hash: Option<String>,
    /// DD.MM.YYYY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_date: Option<String>,
    pub date_confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_room_id: Option<String>,
    /// Requirements hash that licensed the current room lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_eval_hash: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub offers: Vec<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_offer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_hash: Option<String>,
    pub offer_accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_status: Option<SmolStr>,
    pub deposit_info: DepositInfo,
    pub billing_details: BillingDetails,
    pub billing_requirements: BillingRequirements,
    pub site_visit_state: SiteVisitState,
    pub confirmation_state: ConfirmationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_validation: Option<TimeValidation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selected_products: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub selected_catering: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_valid_until: Option<String>,
    /// Processed msg_ids; re-delivery of a listed id is a no-op.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub msgs: Vec<String>,
    /// Free-form processing log lines, one per handled message.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<AuditEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activity_log: Vec<ActivityEntry>,
    pub created_at_ms: u64,
}

/// A broken Event invariant detected after load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("current_step {0} outside [1, 7]")]
    StepOutOfRange(u8),
    #[error("caller_step {0} outside [1, 7]")]
    CallerStepOutOfRange(u8),
    #[error("room locked without a confirmed date")]
    RoomLockWithoutDate,
    #[error("offer accepted but current_offer_id {0:?} not among offers")]
    AcceptedOfferMissing(Option<String>),
    #[error("requirements_hash drifted from stored requirements")]
    RequirementsHashDrift,
}

impl Event {
    pub fn new(client_id: impl Into<String>, thread_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            event_id: EventId::generate(),
            client_id: client_id.into(),
            thread_id: thread_id.into(),
            current_step: 1,
            created_at_ms: now_ms,
            ..Default::default()
        }
    }

    pub fn has_msg(&self, msg_id: &str) -> bool {
        self.msgs.iter().any(|m| m == msg_id)
    }

    pub fn current_offer(&self) -> Option<&Offer> {
        let id = self.current_offer_id.as_deref()?;
        self.offers.iter().find(|o| o.offer_id == id)
    }

    /// Clamp `current_step` into [1, 7].
    pub fn clamp_step(&mut self) {
        self.current_step = self.current_step.clamp(1, 7);
    }

    pub fn append_audit(&mut self, from_step: u8, to_step: u8, reason: &str, ts_ms: u64) {
        self.audit.push(AuditEntry { from_step, to_step, reason: SmolStr::new(reason), ts_ms });
    }

    pub fn log_activity(&mut self, kind: &str, detail: impl Into<String>, ts_ms: u64) {
        self.activity_log.push(ActivityEntry {
            kind: SmolStr::new(kind),
            detail: detail.into(),
            ts_ms,
        });
    }

    /// Check the structural invariants that guards rely on. Violations are
    /// impossible through the normal pipeline; a hit means corrupted storage.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !(1..=7).contains(&self.current_step) {
            return Err(InvariantViolation::StepOutOfRange(self.current_step));
        }
        if let Some(caller) = self.caller_step {
            if !(1..=7).contains(&caller) {
                return Err(InvariantViolation::CallerStepOutOfRange(caller));
            }
        }
        if self.locked_room_id.is_some() && !self.date_confirmed {
            return Err(InvariantViolation::RoomLockWithoutDate);
        }
        if self.offer_accepted && self.current_offer().is_none() {
            return Err(InvariantViolation::AcceptedOfferMissing(self.current_offer_id.clone()));
        }
        if let Some(stored) = &self.requirements_hash {
            if *stored != requirements_hash(&self.requirements) {
                return Err(InvariantViolation::RequirementsHashDrift);
            }
        }
        Ok(())
    }

    /// Field-level fingerprint of the whole record, for idempotency checks.
    pub fn fingerprint(&self) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(serialized.as_bytes());
        let mut hex = String::with_capacity(32);
        for byte in digest.iter().take(16) {
            hex.push_str(&format!("{byte:02x}"));
        }
        hex
    }
}

/// One line of a client's message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_id: String,
    pub subject: String,
    pub snippet: String,
    pub ts: String,
    pub intent: SmolStr,
    pub confidence: f64,
}

/// A client, identified by lowercase email. Created on first contact,
/// never deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<SmolStr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

impl Client {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self { email: email.into(), name, language: None, history: Vec::new() }
    }
}

crate::builder! {
    pub struct EventBuilder => Event {
        into {
            client_id: String = "client@example.com",
            thread_id: String = "thread-1",
        }
        set {
            current_step: u8 = 1,
            date_confirmed: bool = false,
        }
        option {
            chosen_date: String = None,
            locked_room_id: String = None,
            requirements_hash: String = None,
            room_eval_hash: String = None,
        }
        computed {
            event_id: EventId = EventId::generate(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
