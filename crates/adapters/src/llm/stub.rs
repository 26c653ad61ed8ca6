// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic rule-based provider.
//!
//! Stands in for a real LLM in tests and development: keyword and regex
//! recognisers produce a minimal but truthful [`UnifiedDetection`]. The rules
//! deliberately mirror what the production prompts ask for, so workflows
//! behave the same shape under the stub.

use super::{AdapterError, DetectRequest, LlmProvider, VerbalizeFacts};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use vd_core::dates::{find_dates, format_chf, to_ddmmyyyy, to_iso};
use vd_core::{Entities, Intent, Language, Signals, UnifiedDetection};

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn time_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2}:\d{2})\s*(?:–|—|-|to|until|bis)\s*(\d{1,2}:\d{2})").unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn participants_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,4})\s*(?:guests|people|persons|personen|pax|attendees|teilnehmer)\b",
        )
        .unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn for_n_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bfor\s+(\d{1,4})\b").unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn room_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\broom\s+([a-z])\b").unwrap()
    })
}

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn billing_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*billing(?:\s+address)?\s*:\s*(.+)$").unwrap()
    })
}

const GERMAN_HINTS: [&str; 8] =
    ["wir", "und", "möchten", "bitte", "termin", "datum", "uhr", "danke"];

const NAMED_ROOMS: [&str; 3] = ["Room A", "Room B", "Garden Pavilion"];

const PRODUCT_NAMES: [&str; 6] = [
    "Business Lunch",
    "Apéro",
    "Vegetarian Menu",
    "Projector",
    "DJ Package",
    "Stage Package",
];

const ACCEPT_PHRASES: [&str; 6] = [
    "we accept",
    "accept the offer",
    "happy to accept",
    "offer is accepted",
    "go ahead with the offer",
    "sounds good, let's proceed",
];

const DECLINE_PHRASES: [&str; 5] = [
    "we decline",
    "decline the offer",
    "not interested",
    "won't be going ahead",
    "have to cancel",
];

const REVISION_VERBS: [&str; 9] = [
    "change",
    "move",
    "reschedule",
    "switch",
    "postpone",
    "update",
    "verschieben",
    "ändern",
    "wechseln",
];

const CHANGE_TARGETS: [&str; 9] =
    ["date", "day", "room", "guests", "participants", "time", "menu", "datum", "raum"];

/// Rule-based provider used for `ProviderKind::Stub` routing and as both
/// default singletons in development builds.
#[derive(Debug, Clone, Default)]
pub struct StubLlm;

impl StubLlm {
    fn language_of(text: &str) -> Language {
        let lower = text.to_lowercase();
        let hits = GERMAN_HINTS.iter().filter(|w| lower.contains(*w)).count();
        if hits >= 2 {
            Language::De
        } else {
            Language::En
        }
    }

    fn extract_entities_inner(text: &str) -> Entities {
        let mut entities = Entities::default();

        if let Some(date) = find_dates(text).into_iter().next() {
            entities.date_iso = Some(to_iso(date));
            entities.date_text = Some(to_ddmmyyyy(date));
        }
        if let Some(caps) = time_range_re().captures(text) {
            entities.start_time = Some(caps[1].to_string());
            entities.end_time = Some(caps[2].to_string());
        }
        if let Some(caps) = participants_re().captures(text) {
            entities.participants = caps[1].parse().ok();
        } else if let Some(caps) = for_n_re().captures(text) {
            entities.participants = caps[1].parse().ok();
        }

        let lower = text.to_lowercase();
        for name in NAMED_ROOMS {
            if lower.contains(&name.to_lowercase()) {
                entities.room_preference = Some(name.to_string());
                break;
            }
        }
        if entities.room_preference.is_none() {
            if let Some(caps) = room_re().captures(text) {
                entities.room_preference = Some(format!("Room {}", caps[1].to_uppercase()));
            }
        }

        for product in PRODUCT_NAMES {
            let product_lower = product.to_lowercase();
            if lower.contains(&format!("add {product_lower}"))
                || lower.contains(&format!("with {product_lower}"))
                || lower.contains(&format!("include {product_lower}"))
            {
                entities.products_add.push(product.to_string());
            }
            if lower.contains(&format!("remove {product_lower}"))
                || lower.contains(&format!("without {product_lower}"))
                || lower.contains(&format!("drop {product_lower}"))
            {
                entities.products_remove.push(product.to_string());
            }
            if product_lower.contains("menu") && lower.contains(&product_lower) {
                entities.menu_choice = Some(product.to_string());
            }
        }

        if let Some(caps) = billing_line_re().captures(text) {
            entities.billing_address = Some(caps[1].trim().to_string());
        }

        entities
    }

    fn signals_of(text: &str, entities: &Entities) -> Signals {
        let lower = text.to_lowercase();
        let mut signals = Signals::default();

        signals.is_acceptance = ACCEPT_PHRASES.iter().any(|p| lower.contains(p));
        signals.is_rejection = DECLINE_PHRASES.iter().any(|p| lower.contains(p));
        signals.is_confirmation = (lower.contains("confirm") && !lower.contains("confirm?"))
            || lower.contains("bestätigen")
            || lower.contains("that date works");
        signals.is_manager_request = lower.contains("manager")
            || lower.contains("real person")
            || lower.contains("speak to a human");
        signals.is_question = lower.contains('?');
        signals.has_urgency = lower.contains("urgent") || lower.contains("asap");

        let has_verb = REVISION_VERBS.iter().any(|v| lower.contains(v));
        let has_target = CHANGE_TARGETS.iter().any(|t| lower.contains(t))
            || entities.room_preference.is_some();
        // "What if we changed..." stays a question, not a change request
        let hypothetical = lower.contains("what if") || lower.contains("would it be possible");
        signals.is_change_request = has_verb && has_target && !hypothetical;

        signals
    }

    fn qna_types_of(text: &str) -> Vec<smol_str::SmolStr> {
        let lower = text.to_lowercase();
        let mut types = Vec::new();
        for (keyword, label) in [
            ("parking", "parking"),
            ("catering", "catering"),
            ("menu", "catering"),
            ("capacity", "capacity"),
            ("how many people", "capacity"),
            ("price", "pricing"),
            ("cost", "pricing"),
            ("accessib", "accessibility"),
        ] {
            if lower.contains(keyword) && lower.contains('?') {
                let label = smol_str::SmolStr::new(label);
                if !types.contains(&label) {
                    types.push(label);
                }
            }
        }
        types
    }

    fn resolve_intent(
        req: &DetectRequest<'_>,
        signals: &Signals,
        entities: &Entities,
    ) -> (Intent, f64) {
        let lower = req.body.to_lowercase();
        if signals.is_manager_request {
            return (Intent::ManagerRequest, 0.9);
        }
        if lower.contains("cancel the event") || lower.contains("cancel our booking") {
            return (Intent::Cancellation, 0.92);
        }
        if signals.is_rejection && req.current_step >= 4 {
            return (Intent::DeclineOffer, 0.9);
        }
        if signals.is_acceptance && req.current_step >= 4 {
            return (Intent::AcceptOffer, 0.95);
        }
        if signals.is_change_request {
            return (Intent::ChangeRequest, 0.9);
        }
        if signals.is_confirmation && (entities.date_iso.is_some() || lower.contains("date")) {
            return (Intent::ConfirmDate, 0.9);
        }
        if entities.date_iso.is_some()
            || entities.participants.is_some()
            || entities.room_preference.is_some()
            || lower.contains("book")
            || lower.contains("event")
        {
            return (Intent::EventRequest, 0.95);
        }
        if signals.is_question {
            return (Intent::Qna, 0.8);
        }
        (Intent::NonEvent, 0.4)
    }

    fn detect_inner(req: &DetectRequest<'_>) -> UnifiedDetection {
        let entities = Self::extract_entities_inner(req.body);
        let signals = Self::signals_of(req.body, &entities);
        let (intent, confidence) = Self::resolve_intent(req, &signals, &entities);

        let mut detection = UnifiedDetection::new(intent, confidence);
        detection.language = Self::language_of(req.body);
        detection.signals = signals;
        detection.entities = entities;
        detection.qna_types = Self::qna_types_of(req.body);
        detection
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn detect(&self, req: DetectRequest<'_>) -> Result<UnifiedDetection, AdapterError> {
        Ok(Self::detect_inner(&req))
    }

    async fn classify_intent(
        &self,
        req: DetectRequest<'_>,
    ) -> Result<(Intent, f64), AdapterError> {
        let detection = Self::detect_inner(&req);
        Ok((detection.intent, detection.confidence))
    }

    async fn extract_entities(&self, req: DetectRequest<'_>) -> Result<Entities, AdapterError> {
        Ok(Self::extract_entities_inner(req.body))
    }

    async fn verbalize(&self, facts: &VerbalizeFacts) -> Result<String, AdapterError> {
        let mut parts: Vec<String> = Vec::new();
        match (&facts.room, &facts.date) {
            (Some(room), Some(date)) => {
                parts.push(format!("Here is where we stand for {room} on {date}."))
            }
            (Some(room), None) => parts.push(format!("Here is where we stand for {room}.")),
            (None, Some(date)) => parts.push(format!("Here is where we stand for {date}.")),
            (None, None) => parts.push("Here is where we stand with your booking.".to_string()),
        }
        if let Some(participants) = facts.participants {
            parts.push(format!("We are planning for {participants} guests."));
        }
        for (description, amount) in &facts.line_items {
            parts.push(format!("{description}: {}.", format_chf(*amount)));
        }
        if let Some(amount) = facts.amount {
            parts.push(format!("The total comes to {}.", format_chf(amount)));
        }
        if let Some(deposit) = facts.deposit {
            parts.push(format!("A deposit of {} applies.", format_chf(deposit)));
        }
        if let Some(billing) = &facts.billing {
            parts.push(format!("Billing address on file: {billing}."));
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
#[path = "stub_tests.rs"]
mod tests;
