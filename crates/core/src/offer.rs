// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offers and their hash guard.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single priced position on an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    /// Pricing unit: "per person" or "per event".
    pub unit: String,
    pub unit_price: f64,
    pub total: f64,
}

impl LineItem {
    pub fn per_event(description: impl Into<String>, price: f64) -> Self {
        Self {
            description: description.into(),
            quantity: 1,
            unit: "per event".to_string(),
            unit_price: price,
            total: price,
        }
    }

    pub fn per_person(description: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit: "per person".to_string(),
            unit_price,
            total: unit_price * f64::from(quantity),
        }
    }
}

/// One versioned offer on an event. Offer ids are monotonically ordered
/// (`OFR-1`, `OFR-2`, …) within the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: String,
    pub total_amount: f64,
    pub line_items: Vec<LineItem>,
    /// ISO8601 creation timestamp.
    pub created_at: String,
}

impl Offer {
    pub fn total_of(items: &[LineItem]) -> f64 {
        items.iter().map(|i| i.total).sum()
    }
}

/// Next offer id for an event, one past the highest existing sequence number.
pub fn next_offer_id(offers: &[Offer]) -> String {
    let max = offers
        .iter()
        .filter_map(|o| o.offer_id.strip_prefix("OFR-"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("OFR-{}", max + 1)
}

/// Deterministic hash over offer line items, independent of item order.
pub fn offer_hash(items: &[LineItem]) -> String {
    let mut lines: Vec<String> = items
        .iter()
        .map(|i| {
            format!(
                "{}|{}|{}|{:.2}",
                i.description.trim().to_lowercase(),
                i.quantity,
                i.unit.trim().to_lowercase(),
                i.unit_price
            )
        })
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line);
        hasher.update("\n");
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
#[path = "offer_tests.rs"]
mod tests;
