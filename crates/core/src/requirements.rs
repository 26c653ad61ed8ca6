// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event requirements and the requirements hash guard.
//!
//! The hash licenses downstream work: a room lock records the hash it was
//! evaluated against (`room_eval_hash`), and re-evaluation is skipped while
//! the hashes still match.

use crate::detection::Entities;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Start/end time of the event, as written ("14:00".."16:00").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

/// Client requirements captured during intake and refined along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_participants: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seating_layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_room: Option<String>,
}

impl Requirements {
    /// Merge extracted entities into the requirements. Only provided fields
    /// overwrite; returns true when anything changed.
    pub fn merge_entities(&mut self, entities: &Entities) -> bool {
        let mut changed = false;
        if let Some(p) = entities.participants {
            if self.number_of_participants != Some(p) {
                self.number_of_participants = Some(p);
                changed = true;
            }
        }
        if let (Some(start), Some(end)) = (&entities.start_time, &entities.end_time) {
            let window = TimeWindow { start: start.clone(), end: end.clone() };
            if self.duration.as_ref() != Some(&window) {
                self.duration = Some(window);
                changed = true;
            }
        }
        if let Some(room) = &entities.room_preference {
            if self.preferred_room.as_deref() != Some(room.as_str()) {
                self.preferred_room = Some(room.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Stable hash over the requirements.
///
/// Fields are serialized in a fixed order with normalized (trimmed,
/// lowercased) values, so recomputation over a persisted record yields the
/// same value regardless of how the record was produced.
pub fn requirements_hash(req: &Requirements) -> String {
    fn norm(s: &Option<String>) -> String {
        s.as_deref().map(|v| v.trim().to_lowercase()).unwrap_or_default()
    }

    let mut hasher = Sha256::new();
    hasher.update(match req.number_of_participants {
        Some(n) => format!("p={n}"),
        None => "p=".to_string(),
    });
    match &req.duration {
        Some(w) => hasher.update(format!("|d={}-{}", w.start.trim(), w.end.trim())),
        None => hasher.update("|d="),
    }
    hasher.update(format!("|l={}", norm(&req.seating_layout)));
    hasher.update(format!("|s={}", norm(&req.special_requirements)));
    hasher.update(format!("|r={}", norm(&req.preferred_room)));

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
#[path = "requirements_tests.rs"]
mod tests;
