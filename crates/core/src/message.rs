// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message payload.

use serde::{Deserialize, Serialize};

/// Body marker for the synthetic message that resumes a workflow after a
/// manager approves a held draft.
pub const CONTINUE_AFTER_APPROVAL: &str = "[CONTINUE_AFTER_APPROVAL]";

/// One inbound client message (email or chat).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingMessage {
    pub msg_id: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub body: String,
    /// ISO8601 receive timestamp.
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub is_continuation: bool,
    /// Set by the deposit-payment surface: the client just paid, bypass
    /// gates and skip HIL on the resulting confirmation.
    pub deposit_just_paid: bool,
}

impl IncomingMessage {
    /// Client identity: lowercase email.
    pub fn email_lower(&self) -> String {
        self.from_email.trim().to_lowercase()
    }

    /// Year taken from the message timestamp, for day.month dates written
    /// without a year.
    pub fn fallback_year(&self) -> Option<i32> {
        self.ts.get(..4)?.parse().ok()
    }

    /// Synthetic continuation message injected after a HIL approval.
    pub fn continuation(msg_id: impl Into<String>, from_email: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            msg_id: msg_id.into(),
            from_email: from_email.into(),
            body: CONTINUE_AFTER_APPROVAL.to_string(),
            ts: ts.into(),
            is_continuation: true,
            ..Default::default()
        }
    }

    pub fn is_approval_continuation(&self) -> bool {
        self.is_continuation && self.body.trim() == CONTINUE_AFTER_APPROVAL
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
