// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment configuration, persisted inside the store document.
//!
//! Admin updates bump `version`; readers cache the parsed config keyed by
//! that version and re-check it on every message.

use crate::billing::DepositKind;
use serde::{Deserialize, Serialize};

/// Global human-in-the-loop toggle. When enabled, every gated-topic reply
/// becomes a review task instead of an auto-send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HilMode {
    pub enabled: bool,
}

/// Which provider backs an LLM operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Primary,
    Fallback,
    Stub,
}

crate::simple_display! {
    ProviderKind {
        Primary => "primary",
        Fallback => "fallback",
        Stub => "stub",
    }
}

/// Per-operation provider routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmProviderConfig {
    pub intent_provider: ProviderKind,
    pub entity_provider: ProviderKind,
    pub verbalization_provider: ProviderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreFilterMode {
    #[default]
    Enhanced,
    Legacy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreFilterConfig {
    pub mode: PreFilterMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    #[default]
    Unified,
    Legacy,
}

/// Venue-wide deposit policy applied when an offer is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalDeposit {
    pub deposit_enabled: bool,
    pub deposit_type: DepositKind,
    pub deposit_percentage: f64,
    pub deposit_fixed_amount: f64,
    pub deposit_deadline_days: u32,
}

impl Default for GlobalDeposit {
    fn default() -> Self {
        Self {
            deposit_enabled: false,
            deposit_type: DepositKind::Percentage,
            deposit_percentage: 30.0,
            deposit_fixed_amount: 500.0,
            deposit_deadline_days: 14,
        }
    }
}

impl GlobalDeposit {
    /// Deposit amount for a given offer total.
    pub fn amount_for(&self, offer_total: f64) -> f64 {
        match self.deposit_type {
            DepositKind::Percentage => offer_total * self.deposit_percentage / 100.0,
            DepositKind::Fixed => self.deposit_fixed_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingHours {
    pub open: String,
    pub close: String,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self { open: "08:00".to_string(), close: "23:00".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub name: String,
    pub timezone: String,
    pub operating_hours: OperatingHours,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: "The Venue".to_string(),
            timezone: "Europe/Zurich".to_string(),
            operating_hours: OperatingHours::default(),
        }
    }
}

/// Manager-configured site-visit availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteVisitConfig {
    /// ISO dates on which no visit may be offered.
    pub blocked_dates: Vec<String>,
    /// Offered time slots ("10:00", "14:00", …).
    pub slots: Vec<String>,
    pub weekdays_only: bool,
    pub min_days_ahead: u32,
}

impl Default for SiteVisitConfig {
    fn default() -> Self {
        Self {
            blocked_dates: Vec::new(),
            slots: vec!["10:00".to_string(), "14:00".to_string(), "16:00".to_string()],
            weekdays_only: true,
            min_days_ahead: 2,
        }
    }
}

/// Names recognized as escalation targets ("please ask Martina").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagersConfig {
    pub names: Vec<String>,
}

/// Full deployment configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bumped on every admin update; keys the reader-side cache.
    pub version: u64,
    pub hil_mode: HilMode,
    pub llm_provider: LlmProviderConfig,
    pub pre_filter: PreFilterConfig,
    pub detection_mode: DetectionMode,
    pub global_deposit: GlobalDeposit,
    pub venue: VenueConfig,
    pub site_visit: SiteVisitConfig,
    pub managers: ManagersConfig,
    /// Test affordance: surface a dev-choice prompt when an existing event
    /// matches the sender.
    pub dev_mode: bool,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
