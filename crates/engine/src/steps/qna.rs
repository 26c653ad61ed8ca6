// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template answers for recurring venue questions.
//!
//! Q&A is composed deterministically from the catalog and config; an LLM is
//! never needed to state the parking situation.

use vd_adapters::CatalogPort;
use vd_core::dates::format_chf;
use vd_core::Config;

/// Compose an answer for the detected question topics. Returns `None` when
/// no topic has a house answer.
pub fn compose_answer(
    qna_types: &[smol_str::SmolStr],
    catalog: &dyn CatalogPort,
    config: &Config,
) -> Option<String> {
    let mut sections = Vec::new();
    for topic in qna_types {
        match topic.as_str() {
            "parking" => sections.push(format!(
                "{} has parking right by the entrance; spaces can be reserved for your guests.",
                config.venue.name
            )),
            "capacity" => {
                let mut rooms = catalog.rooms();
                rooms.sort_by_key(|r| r.capacity);
                let listing = rooms
                    .iter()
                    .map(|r| format!("{} (up to {} guests)", r.name, r.capacity))
                    .collect::<Vec<_>>()
                    .join(", ");
                sections.push(format!("Our rooms: {listing}."));
            }
            "catering" => {
                let menus = catalog
                    .products()
                    .into_iter()
                    .filter(|p| p.is_catering)
                    .map(|p| format!("{} ({} {})", p.name, format_chf(p.price), p.unit))
                    .collect::<Vec<_>>()
                    .join(", ");
                sections.push(format!("Catering options: {menus}."));
            }
            "pricing" => sections.push(
                "Room rates depend on date and headcount; I'll include exact pricing in your offer."
                    .to_string(),
            ),
            "accessibility" => sections
                .push("All event spaces are step-free and wheelchair accessible.".to_string()),
            _ => {}
        }
    }
    if sections.is_empty() {
        None
    } else {
        Some(sections.join(" "))
    }
}

#[cfg(test)]
#[path = "qna_tests.rs"]
mod tests;
