// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply drafts produced by step handlers.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Draft topics that must always pass human review while HIL mode is on,
/// regardless of the per-draft flag.
pub const HIL_GATED_TOPICS: [&str; 4] =
    ["offer_sent", "offer_confirmation", "transition_message", "final_contract_sent"];

/// Tabular data attached to a draft for the manager panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    /// Two-column field/value table, the common manager-panel shape.
    pub fn field_value(rows: Vec<(&str, String)>) -> Self {
        Self {
            header: vec!["Field".to_string(), "Value".to_string()],
            rows: rows.into_iter().map(|(k, v)| vec![k.to_string(), v]).collect(),
        }
    }
}

/// A reply draft. Auto-sent unless `requires_approval` (or the global HIL
/// toggle) routes it through the task queue first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub body: String,
    /// Markdown rendering for the manager panel, when richer than `body`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_markdown: Option<String>,
    pub step: u8,
    pub topic: SmolStr,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_blocks: Vec<TableBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Draft {
    pub fn new(step: u8, topic: impl Into<SmolStr>, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            body_markdown: None,
            step,
            topic: topic.into(),
            requires_approval: false,
            headers: Vec::new(),
            table_blocks: Vec::new(),
            footer: None,
        }
    }

    crate::setters! {
        into {
            body_markdown: Option<String>,
        }
        set {
            requires_approval: bool,
            table_blocks: Vec<TableBlock>,
        }
    }

    /// Whether this draft must be held for review under the given global
    /// HIL toggle.
    pub fn needs_hil(&self, hil_enabled: bool) -> bool {
        self.requires_approval
            || (hil_enabled && HIL_GATED_TOPICS.contains(&self.topic.as_str()))
    }

    /// Attach the standard workflow footer (step, what happens next, thread
    /// state) shown under every outbound message.
    pub fn with_workflow_footer(mut self, next_step: &str, thread_state: &str) -> Self {
        self.footer = Some(format!(
            "Step {} · Next: {} · Status: {}",
            self.step, next_step, thread_state
        ));
        self
    }
}

#[cfg(test)]
#[path = "draft_tests.rs"]
mod tests;
