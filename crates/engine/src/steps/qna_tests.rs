// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use smol_str::SmolStr;
use vd_adapters::StaticCatalog;

fn topics(names: &[&str]) -> Vec<SmolStr> {
    names.iter().map(|n| SmolStr::new(n)).collect()
}

#[test]
fn capacity_answer_lists_rooms() {
    let answer = compose_answer(
        &topics(&["capacity"]),
        &StaticCatalog::default(),
        &Config::default(),
    )
    .unwrap();
    assert!(answer.contains("Room A"));
    assert!(answer.contains("100"));
}

#[test]
fn catering_answer_prices_menus() {
    let answer = compose_answer(
        &topics(&["catering"]),
        &StaticCatalog::default(),
        &Config::default(),
    )
    .unwrap();
    assert!(answer.contains("Business Lunch"));
    assert!(answer.contains("CHF 45.00"));
}

#[test]
fn multiple_topics_concatenate() {
    let answer = compose_answer(
        &topics(&["parking", "accessibility"]),
        &StaticCatalog::default(),
        &Config::default(),
    )
    .unwrap();
    assert!(answer.contains("parking"));
    assert!(answer.contains("wheelchair"));
}

#[test]
fn unknown_topics_yield_none() {
    assert!(compose_answer(
        &topics(&["weather"]),
        &StaticCatalog::default(),
        &Config::default(),
    )
    .is_none());
    assert!(compose_answer(&[], &StaticCatalog::default(), &Config::default()).is_none());
}
