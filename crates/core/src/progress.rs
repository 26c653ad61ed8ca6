// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing progress: the 7 workflow steps map to 5 stages.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Stage ids in display order.
pub const STAGE_IDS: [&str; 5] = ["date", "room", "offer", "deposit", "confirmed"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStage {
    pub id: SmolStr,
    /// "completed", "active", or "pending".
    pub status: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current_stage: SmolStr,
    pub percentage: u8,
    pub stages: Vec<ProgressStage>,
}

/// Map `current_step` to the progress bar. Steps outside [1, 7] clamp.
pub fn progress_for_step(step: u8) -> Progress {
    let step = step.clamp(1, 7);
    let (stage, percentage) = match step {
        1 => ("date", 0),
        2 => ("date", 20),
        3 => ("room", 40),
        4 => ("offer", 60),
        5 => ("deposit", 70),
        6 => ("deposit", 80),
        _ => ("confirmed", 100),
    };

    let mut stages = Vec::with_capacity(STAGE_IDS.len());
    let mut reached_current = false;
    for id in STAGE_IDS {
        let status = if id == stage {
            reached_current = true;
            "active"
        } else if reached_current {
            "pending"
        } else {
            "completed"
        };
        stages.push(ProgressStage { id: SmolStr::new_static(id), status: SmolStr::new_static(status) });
    }

    Progress { current_stage: SmolStr::new_static(stage), percentage, stages }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
