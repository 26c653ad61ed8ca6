// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change types and their owning steps.
//!
//! When a confirmed variable changes mid-conversation, the change maps to the
//! step that owns it; the router detours there and returns to the caller step
//! afterwards.

use serde::{Deserialize, Serialize};

/// A confirmed variable the client can revise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// `chosen_date` changed (invalidates the room lock).
    Date,
    /// Locked room change requested.
    Room,
    /// Participants / layout / duration / special requirements changed.
    Requirements,
    /// Products or catering changed.
    Products,
    /// Pure price/terms negotiation.
    Commercial,
    /// Reservation / deposit operations.
    Deposit,
    /// Site-visit date or time change.
    SiteVisit,
    /// Billing address, contact or company details.
    ClientInfo,
}

crate::simple_display! {
    ChangeType {
        Date => "date",
        Room => "room",
        Requirements => "requirements",
        Products => "products",
        Commercial => "commercial",
        Deposit => "deposit",
        SiteVisit => "site_visit",
        ClientInfo => "client_info",
    }
}

impl ChangeType {
    /// The step that owns re-evaluation of this variable. `None` means the
    /// change is handled in place (no detour).
    pub fn owner_step(&self) -> Option<u8> {
        match self {
            ChangeType::Date => Some(2),
            ChangeType::Room | ChangeType::Requirements => Some(3),
            ChangeType::Products => Some(4),
            ChangeType::Commercial => Some(5),
            ChangeType::Deposit => Some(7),
            ChangeType::SiteVisit | ChangeType::ClientInfo => None,
        }
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
