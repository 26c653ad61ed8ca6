// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Site-visit sub-state machine.
//!
//! Site visits are venue-wide (not room-specific) and can be initiated from
//! any workflow step. The flow walks date selection → time selection →
//! explicit confirmation → scheduled. Site visits are hard-blocked on event
//! days; events booked onto a visit day only flag a conflict.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteVisitStatus {
    #[default]
    Idle,
    /// Awaiting client to select a date from proposed options.
    DatePending,
    /// Date selected, awaiting a time slot.
    TimePending,
    /// Date+time validated, awaiting explicit confirmation.
    ConfirmPending,
    Scheduled,
    Completed,
    Cancelled,
}

crate::simple_display! {
    SiteVisitStatus {
        Idle => "idle",
        DatePending => "date_pending",
        TimePending => "time_pending",
        ConfirmPending => "confirm_pending",
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// Per-event site-visit state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteVisitState {
    pub status: SiteVisitStatus,
    /// Scheduled date (ISO).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_iso: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    /// Offered dates (ISO) during date selection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proposed_dates: Vec<String>,
    /// Offered time slots during time selection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proposed_slots: Vec<String>,
    /// Date picked by the client (ISO), before a time is chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<String>,
    /// Slot awaiting confirmation, e.g. "2026-01-20 at 10:00".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_slot: Option<String>,
    /// Workflow step (2-7) that initiated the flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiated_at_step: Option<u8>,
    /// An event was booked onto this visit date after scheduling.
    pub has_event_conflict: bool,
    /// Legacy field: site visits were once room-specific. Read, never written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

impl SiteVisitState {
    /// A selection is in flight (date, time, or confirmation pending).
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SiteVisitStatus::DatePending
                | SiteVisitStatus::TimePending
                | SiteVisitStatus::ConfirmPending
        )
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == SiteVisitStatus::Scheduled
    }

    /// Begin a new flow at date selection.
    pub fn start_flow(&mut self, initiated_at_step: u8, proposed_dates: Vec<String>) {
        *self = SiteVisitState {
            status: SiteVisitStatus::DatePending,
            proposed_dates,
            initiated_at_step: Some(initiated_at_step),
            ..Default::default()
        };
    }

    /// Client picked a date; offer time slots next.
    pub fn set_time_pending(&mut self, selected_date: impl Into<String>, slots: Vec<String>) {
        self.status = SiteVisitStatus::TimePending;
        self.selected_date = Some(selected_date.into());
        self.proposed_slots = slots;
    }

    /// Date+time validated; hold for explicit confirmation.
    pub fn set_pending_confirmation(&mut self, pending_slot: impl Into<String>) {
        self.status = SiteVisitStatus::ConfirmPending;
        self.pending_slot = Some(pending_slot.into());
    }

    /// Confirm the pending slot. Returns false when there is nothing to
    /// confirm or the slot cannot be parsed.
    pub fn confirm_pending(&mut self) -> bool {
        if self.status != SiteVisitStatus::ConfirmPending {
            return false;
        }
        let Some(slot) = self.pending_slot.clone() else {
            return false;
        };
        let (date_iso, time_slot) = crate::dates::parse_slot(&slot);
        let Some(date_iso) = date_iso else {
            return false;
        };
        self.date_iso = Some(date_iso);
        self.time_slot = time_slot;
        self.status = SiteVisitStatus::Scheduled;
        self.pending_slot = None;
        true
    }

    /// Schedule directly (date already validated upstream).
    pub fn schedule(&mut self, date_iso: impl Into<String>, time_slot: Option<String>) {
        self.date_iso = Some(date_iso.into());
        self.time_slot = time_slot;
        self.status = SiteVisitStatus::Scheduled;
        self.pending_slot = None;
    }

    pub fn mark_conflict(&mut self) {
        self.has_event_conflict = true;
    }

    pub fn complete(&mut self) {
        self.status = SiteVisitStatus::Completed;
    }

    pub fn cancel(&mut self) {
        self.status = SiteVisitStatus::Cancelled;
    }

    /// Back to idle, clearing every selection (used when an event-date change
    /// interrupts the flow).
    pub fn reset(&mut self) {
        *self = SiteVisitState::default();
    }
}

/// Whether a message explicitly asks to move a site visit.
///
/// Restrictive on purpose: requires an explicit site-visit mention AND a
/// rescheduling verb, so event-date changes never match.
pub fn is_site_visit_change_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    let explicit = [
        "site visit",
        "venue tour",
        "tour of",
        "venue visit",
        "walkthrough",
        "viewing",
        "besichtigung",
    ];
    let has_mention = explicit.iter().any(|kw| lower.contains(kw))
        || lower.contains("the visit")
        || lower.contains("the tour");
    if !has_mention {
        return false;
    }
    let change_verbs = [
        "change",
        "reschedule",
        "move",
        "switch",
        "postpone",
        "different",
        "another time",
        "new time",
    ];
    change_verbs.iter().any(|verb| lower.contains(verb))
}

#[cfg(test)]
#[path = "site_visit_tests.rs"]
mod tests;
