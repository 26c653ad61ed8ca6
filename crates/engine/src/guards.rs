// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-route guards: pure, read-only predicates over an Event.
//!
//! Guards express the step the event *should* be in given its hard state
//! (date, room lock, hash drift) plus the gate flags that suppress forcing.
//! They never mutate; the router applies the result.

use vd_core::requirements::requirements_hash;
use vd_core::{DepositStatus, Event};

/// Result of one guard evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardSnapshot {
    /// Step the event must re-enter, unless a gate suppresses it.
    pub forced_step: Option<u8>,
    /// Requirements drifted from the hash that licensed the room lock.
    pub requirements_hash_changed: bool,
    pub step2_required: bool,
    /// Filled by the router from the calendar when step 2 is forced.
    pub candidate_dates: Vec<String>,
    /// Deposit settlement is in flight at step 7; leave the step alone.
    pub deposit_bypass: bool,
    /// A site-visit selection is pending; date mentions bind to the visit.
    pub site_visit_guard: bool,
    /// Accepted offer awaiting billing; forcing steps would lose the flow.
    pub billing_flow_active: bool,
}

impl GuardSnapshot {
    /// The step the router should actually force, after gates.
    pub fn effective_forced_step(&self, current_step: u8) -> Option<u8> {
        if self.billing_flow_active || self.deposit_bypass {
            return None;
        }
        match self.forced_step {
            Some(step) if step != current_step => Some(step),
            _ => None,
        }
    }
}

/// Evaluate the guards for an event. Read-only.
pub fn evaluate(event: &Event) -> GuardSnapshot {
    let mut snapshot = GuardSnapshot::default();

    snapshot.billing_flow_active =
        event.offer_accepted && event.billing_requirements.awaiting_billing_for_accept;
    snapshot.site_visit_guard = event.site_visit_state.is_active();
    snapshot.deposit_bypass = event.current_step == 7
        && event.deposit_info.status == DepositStatus::Requested
        && !event.deposit_info.paid;

    if !event.date_confirmed {
        snapshot.step2_required = true;
        snapshot.forced_step = Some(2);
        return snapshot;
    }

    match &event.locked_room_id {
        None => {
            snapshot.forced_step = Some(3);
        }
        Some(_) => {
            let current_hash = event
                .requirements_hash
                .clone()
                .unwrap_or_else(|| requirements_hash(&event.requirements));
            if event.room_eval_hash.as_deref() != Some(current_hash.as_str()) {
                snapshot.requirements_hash_changed = true;
                snapshot.forced_step = Some(3);
            }
        }
    }

    snapshot
}

#[cfg(test)]
#[path = "guards_tests.rs"]
mod tests;
