// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    date         = { ChangeType::Date, Some(2) },
    room         = { ChangeType::Room, Some(3) },
    requirements = { ChangeType::Requirements, Some(3) },
    products     = { ChangeType::Products, Some(4) },
    commercial   = { ChangeType::Commercial, Some(5) },
    deposit      = { ChangeType::Deposit, Some(7) },
    site_visit   = { ChangeType::SiteVisit, None },
    client_info  = { ChangeType::ClientInfo, None },
)]
fn owner_steps(change: ChangeType, expected: Option<u8>) {
    assert_eq!(change.owner_step(), expected);
}

#[test]
fn serde_round_trip() {
    let json = serde_json::to_string(&ChangeType::SiteVisit).unwrap();
    assert_eq!(json, "\"site_visit\"");
    let back: ChangeType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ChangeType::SiteVisit);
}
