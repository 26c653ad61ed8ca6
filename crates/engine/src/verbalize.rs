// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verbalizer sandwich: generate → verify facts → patch or fall back.
//!
//! Generated prose must contain every input fact (dates, amounts, room
//! names, counts) in a recognized format, and must not introduce foreign
//! numbers or dates. Unit swaps (per person ↔ per event) are auto-patched
//! when unambiguous; anything else falls back to a deterministic template.

use regex::Regex;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vd_adapters::llm::VerbalizeFacts;
use vd_adapters::ProviderRouter;
use vd_core::dates::{date_aliases, format_chf, parse_client_date};
use vd_core::{Draft, LlmProviderConfig};

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn number_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9][0-9'.,/:-]*").unwrap()
    })
}

/// Result of the fact-verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactCheck {
    pub missing: Vec<String>,
    pub foreign_numbers: Vec<String>,
}

impl FactCheck {
    pub fn ok(&self) -> bool {
        self.missing.is_empty() && self.foreign_numbers.is_empty()
    }
}

fn amount_renderings(amount: f64) -> Vec<String> {
    let chf = format_chf(amount);
    let plain = if (amount.fract()).abs() < f64::EPSILON {
        format!("{}", amount as i64)
    } else {
        format!("{amount:.2}")
    };
    vec![chf, format!("{amount:.2}"), plain]
}

/// Every string rendering the prose is allowed to contain for these facts.
fn allowed_renderings(facts: &VerbalizeFacts) -> Vec<String> {
    let mut allowed = Vec::new();
    if let Some(date) = &facts.date {
        if let Some(parsed) = parse_client_date(date) {
            allowed.extend(date_aliases(parsed));
        } else {
            allowed.push(date.clone());
        }
    }
    if let Some(room) = &facts.room {
        allowed.push(room.clone());
    }
    if let Some(participants) = facts.participants {
        allowed.push(participants.to_string());
    }
    if let Some(amount) = facts.amount {
        allowed.extend(amount_renderings(amount));
    }
    if let Some(deposit) = facts.deposit {
        allowed.extend(amount_renderings(deposit));
    }
    for (label, amount) in &facts.line_items {
        allowed.push(label.clone());
        allowed.extend(amount_renderings(*amount));
    }
    if let Some(billing) = &facts.billing {
        allowed.push(billing.clone());
    }
    allowed
}

/// Check that every fact appears and no foreign numeric value crept in.
pub fn verify_facts(facts: &VerbalizeFacts, prose: &str) -> FactCheck {
    let allowed = allowed_renderings(facts);
    let mut check = FactCheck::default();

    let mut require = |label: &str, renderings: &[String]| {
        if !renderings.iter().any(|r| prose.to_lowercase().contains(&r.to_lowercase())) {
            check.missing.push(label.to_string());
        }
    };

    if let Some(date) = &facts.date {
        let aliases = parse_client_date(date)
            .map(date_aliases)
            .unwrap_or_else(|| vec![date.clone()]);
        require("date", &aliases);
    }
    if let Some(room) = &facts.room {
        require("room", std::slice::from_ref(room));
    }
    if let Some(participants) = facts.participants {
        require("participants", &[participants.to_string()]);
    }
    if let Some(amount) = facts.amount {
        require("total", &amount_renderings(amount));
    }
    if let Some(deposit) = facts.deposit {
        require("deposit", &amount_renderings(deposit));
    }

    for token in number_token_re().find_iter(prose) {
        let token = token.as_str().trim_end_matches(['.', ',', ':', '-', '/']);
        if token.is_empty() {
            continue;
        }
        let known = allowed.iter().any(|a| a.contains(token));
        if !known {
            check.foreign_numbers.push(token.to_string());
        }
    }

    check
}

/// Auto-patch an unambiguous pricing-unit swap. Only fires when the facts
/// use a single unit and the prose names the other one.
pub fn patch_units(prose: &str, facts: &VerbalizeFacts) -> String {
    let labels = facts.line_items.iter().map(|(l, _)| l.to_lowercase()).collect::<Vec<_>>();
    let wants_person = labels.iter().any(|l| l.contains("per person"));
    let wants_event = labels.iter().any(|l| l.contains("per event"));

    if wants_person && !wants_event && prose.contains("per event") {
        return prose.replace("per event", "per person");
    }
    if wants_event && !wants_person && prose.contains("per person") {
        return prose.replace("per person", "per event");
    }
    prose.to_string()
}

/// Deterministic rendering used when generation drifts beyond repair.
pub fn template_fallback(facts: &VerbalizeFacts) -> String {
    let mut lines: Vec<String> = Vec::new();
    match (&facts.room, &facts.date) {
        (Some(room), Some(date)) => lines.push(format!("Summary for {room} on {date}:")),
        (Some(room), None) => lines.push(format!("Summary for {room}:")),
        (None, Some(date)) => lines.push(format!("Summary for {date}:")),
        (None, None) => lines.push("Booking summary:".to_string()),
    }
    if let Some(participants) = facts.participants {
        lines.push(format!("- Guests: {participants}"));
    }
    for (label, amount) in &facts.line_items {
        lines.push(format!("- {label}: {}", format_chf(*amount)));
    }
    if let Some(amount) = facts.amount {
        lines.push(format!("- Total: {}", format_chf(amount)));
    }
    if let Some(deposit) = facts.deposit {
        lines.push(format!("- Deposit: {}", format_chf(deposit)));
    }
    if let Some(billing) = &facts.billing {
        lines.push(format!("- Billing: {billing}"));
    }
    lines.join("\n")
}

/// Run the full sandwich over one draft body.
pub async fn finalize_draft(
    router: &ProviderRouter,
    routing: &LlmProviderConfig,
    facts: &VerbalizeFacts,
    mut draft: Draft,
    cancel: &CancellationToken,
) -> Draft {
    let generated = match router.verbalize(routing, facts, cancel).await {
        Ok(prose) => prose,
        Err(err) => {
            warn!(error = %err, "verbalizer unavailable, using template");
            draft.body = template_fallback(facts);
            return draft;
        }
    };

    let patched = patch_units(&generated, facts);
    let check = verify_facts(facts, &patched);
    if check.ok() {
        draft.body = patched;
    } else {
        warn!(
            missing = ?check.missing,
            foreign = ?check.foreign_numbers,
            "verbalizer drift, using template"
        );
        draft.body = template_fallback(facts);
    }
    draft
}

#[cfg(test)]
#[path = "verbalize_tests.rs"]
mod tests;
