// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Billing details, billing gates, and deposit state.

use serde::{Deserialize, Serialize};

/// Billing address captured from the client.
///
/// Country is optional for the confirmation gate; everything else is
/// required before a final contract can go out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_or_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl BillingDetails {
    /// Required fields still missing for the confirmation billing gate.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name_or_company.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("name_or_company");
        }
        if self.street.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("street");
        }
        if self.postal_code.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("postal_code");
        }
        if self.city.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("city");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Single-line rendering for drafts and manager tables.
    pub fn summary_line(&self) -> String {
        let parts: Vec<&str> = [
            self.name_or_company.as_deref(),
            self.street.as_deref(),
            self.postal_code.as_deref(),
            self.city.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect();
        if parts.is_empty() {
            "Not specified".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Best-effort parse of a free-form billing address line:
    /// "ACME AG, Bahnhofstrasse 1, 8001 Zurich, Switzerland".
    pub fn parse_freeform(text: &str) -> Option<Self> {
        let parts: Vec<&str> =
            text.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            return None;
        }
        let mut details = BillingDetails {
            name_or_company: Some(parts[0].to_string()),
            street: Some(parts[1].to_string()),
            ..Default::default()
        };
        // Third segment is "postal city" or just the city
        let mut seg = parts[2].splitn(2, ' ');
        match (seg.next(), seg.next()) {
            (Some(code), Some(city)) if code.chars().all(|c| c.is_ascii_digit()) => {
                details.postal_code = Some(code.to_string());
                details.city = Some(city.to_string());
            }
            _ => details.city = Some(parts[2].to_string()),
        }
        if let Some(country) = parts.get(3) {
            details.country = Some((*country).to_string());
        }
        Some(details)
    }

    /// Merge captured fields into self; only empty fields are filled.
    /// Returns true when anything changed.
    pub fn absorb(&mut self, other: &BillingDetails) -> bool {
        let mut changed = false;
        let fields = [
            (&mut self.name_or_company, &other.name_or_company),
            (&mut self.street, &other.street),
            (&mut self.postal_code, &other.postal_code),
            (&mut self.city, &other.city),
            (&mut self.country, &other.country),
        ];
        for (mine, theirs) in fields {
            if mine.as_deref().unwrap_or("").trim().is_empty() {
                if let Some(v) = theirs {
                    *mine = Some(v.clone());
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Flags tracking an in-flight billing capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingRequirements {
    /// Offer was accepted but billing must land before moving on.
    pub awaiting_billing_for_accept: bool,
    /// Final confirmation is gated on a complete billing address.
    pub awaiting_billing_for_confirmation: bool,
}

impl BillingRequirements {
    pub fn billing_flow_active(&self) -> bool {
        self.awaiting_billing_for_accept || self.awaiting_billing_for_confirmation
    }
}

/// How the deposit amount is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositKind {
    #[default]
    Percentage,
    Fixed,
}

/// Progression of the deposit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    #[default]
    NotRequired,
    Requested,
    Paid,
}

crate::simple_display! {
    DepositStatus {
        NotRequired => "not_required",
        Requested => "requested",
        Paid => "paid",
    }
}

/// Deposit state for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositInfo {
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: DepositKind,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub paid: bool,
    pub status: DepositStatus,
}

impl DepositInfo {
    pub fn mark_requested(&mut self) {
        self.required = true;
        if self.status != DepositStatus::Paid {
            self.status = DepositStatus::Requested;
        }
    }

    pub fn mark_paid(&mut self) {
        self.paid = true;
        self.status = DepositStatus::Paid;
    }

    /// Deposit blocks confirmation while required and unpaid.
    pub fn blocks_confirmation(&self) -> bool {
        self.required && !self.paid
    }
}

#[cfg(test)]
#[path = "billing_tests.rs"]
mod tests;
