// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level end-to-end specs for the booking workflow engine.

#[path = "specs/concurrency.rs"]
mod concurrency;
#[path = "specs/hil_flow.rs"]
mod hil_flow;
#[path = "specs/scenarios.rs"]
mod scenarios;
#[path = "specs/support.rs"]
mod support;
