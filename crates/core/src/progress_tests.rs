// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    step1 = { 1, "date", 0 },
    step2 = { 2, "date", 20 },
    step3 = { 3, "room", 40 },
    step4 = { 4, "offer", 60 },
    step5 = { 5, "deposit", 70 },
    step6 = { 6, "deposit", 80 },
    step7 = { 7, "confirmed", 100 },
)]
fn stage_mapping(step: u8, stage: &str, percentage: u8) {
    let progress = progress_for_step(step);
    assert_eq!(progress.current_stage, stage);
    assert_eq!(progress.percentage, percentage);
}

#[test]
fn out_of_range_steps_clamp() {
    assert_eq!(progress_for_step(0).current_stage, "date");
    assert_eq!(progress_for_step(99).current_stage, "confirmed");
    assert_eq!(progress_for_step(99).percentage, 100);
}

#[test]
fn stage_statuses_partition() {
    let progress = progress_for_step(4);
    let statuses: Vec<&str> = progress.stages.iter().map(|s| s.status.as_str()).collect();
    assert_eq!(statuses, vec!["completed", "completed", "active", "pending", "pending"]);
}

#[test]
fn progress_round_trips() {
    let progress = progress_for_step(5);
    let json = serde_json::to_string(&progress).unwrap();
    let back: Progress = serde_json::from_str(&json).unwrap();
    assert_eq!(back, progress);
}
