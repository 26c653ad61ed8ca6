// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Visible fallbacks.
//!
//! When something fails, the client still gets a reply and the failure is
//! recorded where an operator will see it. Responses that pretend everything
//! worked are forbidden.

use serde::Serialize;
use smol_str::SmolStr;
use vd_core::{Draft, EventId};

/// Context record attached to every fallback reply.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackContext {
    /// Code location, e.g. "router.detect".
    pub source: SmolStr,
    /// Machine trigger, e.g. "provider_unavailable".
    pub trigger: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ts_ms: u64,
}

impl FallbackContext {
    pub fn new(source: &str, trigger: &str, ts_ms: u64) -> Self {
        Self {
            source: SmolStr::new(source),
            trigger: SmolStr::new(trigger),
            event_id: None,
            thread_id: None,
            error: None,
            ts_ms,
        }
    }

    pub fn event_id(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Log the fallback and wrap the user-facing message into a draft.
    ///
    /// `dev_diagnostics` appends the context inline (dev deployments only);
    /// production keeps the message clean and relies on the log.
    pub fn into_draft(self, step: u8, user_message: &str, dev_diagnostics: bool) -> Draft {
        tracing::error!(
            source = %self.source,
            trigger = %self.trigger,
            event_id = ?self.event_id,
            thread_id = ?self.thread_id,
            error = ?self.error,
            "fallback emitted"
        );
        let body = if dev_diagnostics {
            match &self.error {
                Some(error) => {
                    format!("{user_message}\n\n[DEV] {} | {} | {}", self.source, self.trigger, error)
                }
                None => format!("{user_message}\n\n[DEV] {} | {}", self.source, self.trigger),
            }
        } else {
            user_message.to_string()
        };
        Draft::new(step, "fallback_notice", body)
    }
}

#[cfg(test)]
#[path = "fallback_tests.rs"]
mod tests;
