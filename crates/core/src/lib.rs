// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vd-core: Domain model for the Venue Desk booking workflow engine

pub mod macros;

pub mod billing;
pub mod change;
pub mod clock;
pub mod config;
pub mod dates;
pub mod detection;
pub mod draft;
pub mod event;
pub mod id;
pub mod message;
pub mod offer;
pub mod progress;
pub mod requirements;
pub mod site_visit;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use billing::{BillingDetails, BillingRequirements, DepositInfo, DepositKind, DepositStatus};
pub use change::ChangeType;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    Config, DetectionMode, GlobalDeposit, HilMode, LlmProviderConfig, ManagersConfig,
    OperatingHours, PreFilterConfig, PreFilterMode, ProviderKind, SiteVisitConfig, VenueConfig,
};
pub use detection::{Entities, Intent, Language, Signals, UnifiedDetection};
pub use draft::{Draft, TableBlock, HIL_GATED_TOPICS};
#[cfg(any(test, feature = "test-support"))]
pub use event::EventBuilder;
pub use event::{
    ActivityEntry, AuditEntry, Client, ConfirmationPending, ConfirmationState, Event, EventStatus,
    HistoryEntry, InvariantViolation, ThreadState, TimeValidation,
};
pub use id::{EventId, TaskId};
pub use message::{IncomingMessage, CONTINUE_AFTER_APPROVAL};
pub use offer::{next_offer_id, offer_hash, LineItem, Offer};
pub use progress::{progress_for_step, Progress, ProgressStage};
pub use requirements::{requirements_hash, Requirements, TimeWindow};
pub use site_visit::{SiteVisitState, SiteVisitStatus};
pub use task::{Task, TaskStatus, TaskType};
