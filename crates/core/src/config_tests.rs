// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_json_yields_defaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert!(!config.hil_mode.enabled);
    assert_eq!(config.detection_mode, DetectionMode::Unified);
    assert_eq!(config.pre_filter.mode, PreFilterMode::Enhanced);
    assert_eq!(config.venue.operating_hours.open, "08:00");
    assert_eq!(config.site_visit.slots.len(), 3);
}

#[test]
fn partial_override_keeps_other_defaults() {
    let config: Config = serde_json::from_str(
        r#"{"hil_mode":{"enabled":true},"detection_mode":"legacy"}"#,
    )
    .unwrap();
    assert!(config.hil_mode.enabled);
    assert_eq!(config.detection_mode, DetectionMode::Legacy);
    assert_eq!(config.llm_provider.intent_provider, ProviderKind::Primary);
}

#[yare::parameterized(
    percentage = { DepositKind::Percentage, 2000.0, 600.0 },
    fixed      = { DepositKind::Fixed, 2000.0, 500.0 },
)]
fn deposit_amounts(kind: DepositKind, total: f64, expected: f64) {
    let deposit = GlobalDeposit { deposit_type: kind, ..Default::default() };
    assert_eq!(deposit.amount_for(total), expected);
}

#[test]
fn config_round_trip() {
    let mut config = Config::default();
    config.version = 7;
    config.managers.names.push("Martina".to_string());
    let json = serde_json::to_string(&config).unwrap();
    let back: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
