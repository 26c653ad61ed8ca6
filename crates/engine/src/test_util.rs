// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for step-handler tests.

use crate::state::{StepContext, WorkflowState};
use chrono::NaiveDate;
use vd_adapters::{StaticCalendar, StaticCatalog};
use vd_core::test_support::message;
use vd_core::{Config, Event, UnifiedDetection};
use vd_storage::Db;

/// Owns everything a [`StepContext`] borrows.
pub struct Harness {
    pub db: Db,
    pub state: WorkflowState,
    pub calendar: StaticCalendar,
    pub catalog: StaticCatalog,
}

impl Harness {
    /// Harness around one message and its detection; "today" is pinned to
    /// 2026-01-01.
    pub fn new(body: &str, detection: UnifiedDetection) -> Self {
        let msg = message("m1", body);
        let state = WorkflowState::new(
            msg.clone(),
            crate::text::prepare_body(&msg.body),
            detection,
            Config::default(),
            1_000,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
        );
        Self {
            db: Db::default(),
            state,
            calendar: StaticCalendar::default(),
            catalog: StaticCatalog::default(),
        }
    }

    /// Seed an event and point the state at it.
    pub fn with_event(mut self, event: Event) -> Self {
        self.db.events.push(event);
        self.state.event_idx = Some(self.db.events.len() - 1);
        self
    }

    pub fn ctx(&mut self) -> StepContext<'_> {
        StepContext {
            db: &mut self.db,
            state: &mut self.state,
            calendar: &self.calendar,
            catalog: &self.catalog,
        }
    }

    pub fn event(&self) -> &Event {
        &self.db.events[0]
    }
}
