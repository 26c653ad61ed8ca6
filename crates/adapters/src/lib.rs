// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vd-adapters: Contracts for external collaborators.
//!
//! The workflow core talks to LLM providers, the venue calendar, and the
//! room/product catalog exclusively through the traits defined here. Real
//! backends live outside this workspace; the in-tree implementations are the
//! deterministic stub provider and static calendar/catalog used in tests and
//! development.

pub mod calendar;
pub mod catalog;
pub mod llm;

pub use calendar::{CalendarPort, StaticCalendar};
pub use catalog::{CatalogPort, ProductSpec, RoomSpec, StaticCatalog};
pub use llm::{
    init_providers, providers, reset_providers, AdapterError, DetectRequest, LlmProvider,
    ProviderRouter, StubLlm, VerbalizeFacts,
};

#[cfg(any(test, feature = "test-support"))]
pub use llm::scripted::ScriptedLlm;
