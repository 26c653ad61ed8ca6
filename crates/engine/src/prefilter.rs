// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cheap pre-detection checks run on every message before any LLM call.
//!
//! Structural attacks are delimiter injection only (`<system>`, `[SYSTEM]`,
//! fenced role markers); natural-language manipulation is left to the
//! semantic classifier. A structural hit routes straight to manual review.

use regex::Regex;
use std::sync::OnceLock;
use vd_core::{Event, IncomingMessage, Language};

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn structural_attack_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)</?\s*(system|assistant|developer)\s*>|\[\s*(SYSTEM|ASSISTANT)\s*\]|```\s*(system|assistant)",
        )
        .unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn billing_signal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(billing|invoice|rechnung)\b|\b\d{4,5}\s+[A-ZÄÖÜ][a-zäöü]+\b").unwrap()
    })
}

/// Flags produced by the pre-filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreFilter {
    /// msg_id already processed on this event.
    pub is_duplicate: bool,
    pub has_billing_signal: bool,
    pub language_hint: Option<Language>,
    /// Delimiter injection detected; do not let this body near a prompt.
    pub is_structural_attack: bool,
}

/// Run the pre-filter over a prepared (normalized, history-stripped) body.
pub fn pre_filter(msg: &IncomingMessage, body: &str, event: Option<&Event>) -> PreFilter {
    let is_duplicate =
        event.is_some_and(|e| !msg.msg_id.is_empty() && e.has_msg(&msg.msg_id));

    // Attack markers may hide in the quoted section too; scan the raw body.
    let is_structural_attack =
        structural_attack_re().is_match(body) || structural_attack_re().is_match(&msg.body);

    let has_billing_signal = billing_signal_re().is_match(body);

    let lower = body.to_lowercase();
    let german_hits = ["wir", "möchten", "bitte", "termin", "datum"]
        .iter()
        .filter(|w| lower.contains(*w))
        .count();
    let language_hint = if german_hits >= 2 { Some(Language::De) } else { None };

    PreFilter { is_duplicate, has_billing_signal, language_hint, is_structural_attack }
}

#[cfg(test)]
#[path = "prefilter_tests.rs"]
mod tests;
