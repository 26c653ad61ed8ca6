// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The result record emitted for every processed message.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use vd_core::{Draft, EventId, Intent, Progress, ThreadState};

/// HIL-related response fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HilStatus {
    pub pending_hil_approval: bool,
}

/// Test affordance: an existing event matched the sender and dev mode asked
/// the operator to choose how to proceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevChoice {
    pub existing_event_id: EventId,
    pub current_step: u8,
    pub options: Vec<String>,
}

/// Outcome of one `process_msg` cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub action: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub draft_messages: Vec<Draft>,
    /// Every step action recorded during the cycle, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SmolStr>,
    pub thread_state: ThreadState,
    pub current_step: u8,
    pub progress: Progress,
    pub res: HilStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_choice: Option<DevChoice>,
}

impl ProcessOutcome {
    /// Minimal outcome for flows that never touched an event.
    pub fn detached(action: impl Into<SmolStr>, confidence: f64) -> Self {
        Self {
            action: action.into(),
            event_id: None,
            thread_id: None,
            intent: None,
            confidence,
            draft_messages: Vec::new(),
            actions: Vec::new(),
            thread_state: ThreadState::AwaitingClient,
            current_step: 1,
            progress: vd_core::progress_for_step(1),
            res: HilStatus::default(),
            dev_choice: None,
        }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
