// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The router: one entrypoint per inbound message.
//!
//! Pipeline: acquire the store lock for the whole cycle → resolve client and
//! event (duplicate replay) → pre-filter → detection → intake (always) →
//! pre-route guards → step dispatch → verbalize → HIL routing → persist →
//! emit. Failures surface as visible fallback replies, never silence.

use crate::error::EngineError;
use crate::guards;
use crate::prefilter::pre_filter;
use crate::sessions::{ActiveConversations, SessionInfo};
use crate::state::{GroupResult, StepContext, WorkflowState};
use crate::steps::handler_for;
use crate::text::prepare_body;
use crate::trace::{trace_bus, TraceKind};
use crate::verbalize::finalize_draft;
use parking_lot::Mutex;
use serde_json::json;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vd_adapters::llm::DetectRequest;
use vd_adapters::{
    providers, CalendarPort, CatalogPort, ProviderRouter, StaticCalendar, StaticCatalog,
};
use vd_core::dates::to_ddmmyyyy;
use vd_core::{
    progress_for_step, Clock, Config, DetectionMode, Draft, Event, IncomingMessage, Intent,
    Signals, SystemClock, Task, TaskType, ThreadState, UnifiedDetection,
};
use vd_storage::{enqueue_task, event_by_thread, last_event_for_email, Store};
use vd_wire::{HilStatus, ProcessOutcome};

/// External collaborators the engine talks to.
#[derive(Clone)]
pub struct EngineDeps {
    pub providers: Arc<ProviderRouter>,
    pub calendar: Arc<dyn CalendarPort>,
    pub catalog: Arc<dyn CatalogPort>,
}

impl Default for EngineDeps {
    fn default() -> Self {
        Self {
            providers: providers(),
            calendar: Arc::new(StaticCalendar::default()),
            catalog: Arc::new(StaticCatalog::default()),
        }
    }
}

/// The workflow engine. One instance serves all threads; per-thread
/// serialization happens at the store lock.
pub struct Engine<C: Clock = SystemClock> {
    deps: EngineDeps,
    clock: C,
    pub(crate) sessions: ActiveConversations,
    /// Last config version seen per store path (hot-reload observability).
    config_versions: Mutex<HashMap<PathBuf, u64>>,
}

impl Engine<SystemClock> {
    pub fn with_defaults() -> Self {
        Self::new(EngineDeps::default(), SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    pub(crate) fn clock_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub fn new(deps: EngineDeps, clock: C) -> Self {
        Self {
            deps,
            clock,
            sessions: ActiveConversations::default(),
            config_versions: Mutex::new(HashMap::new()),
        }
    }

    /// Process one inbound message against the store at `db_path`. Always
    /// returns a non-empty outcome; internal failures become fallback
    /// replies.
    pub async fn process_msg(&self, msg: IncomingMessage, db_path: &Path) -> ProcessOutcome {
        match self.process_inner(msg.clone(), db_path).await {
            Ok(outcome) => outcome,
            Err(err) => self.failure_outcome(&msg, db_path, err).await,
        }
    }

    async fn process_inner(
        &self,
        msg: IncomingMessage,
        db_path: &Path,
    ) -> Result<ProcessOutcome, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let today = self.clock.today();
        let mut store = open_store(db_path).await?;

        let config = store.config().clone();
        self.note_config_version(db_path, config.version);

        let body = prepare_body(&msg.body);
        let client_id = msg.email_lower();
        let thread_id = msg
            .thread_id
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| client_id.clone());

        let event_idx = event_by_thread(store.db(), &thread_id)
            .or_else(|| last_event_for_email(store.db(), &client_id));
        let event_ref = event_idx.and_then(|i| store.db().events.get(i));

        // Idempotency short-circuit: re-delivery replays the current state
        // without touching anything.
        if let Some(event) = event_ref {
            if !msg.msg_id.is_empty() && event.has_msg(&msg.msg_id) && !msg.is_continuation {
                info!(msg_id = %msg.msg_id, "duplicate delivery replayed");
                return Ok(replay_outcome(event));
            }
            // A broken invariant in the stored record means corrupted
            // storage; route to a human instead of computing on garbage.
            if let Err(violation) = event.check_invariants() {
                warn!(error = %violation, "stored event violates invariants");
                let event_id = event.event_id.clone();
                let task = Task::new(TaskType::ManualReview, now_ms)
                    .client_id(client_id.clone())
                    .event_id(event_id)
                    .context(format!("invariant violation: {violation}"));
                enqueue_task(store.db_mut(), task);
                store.commit()?;
                let ctx = crate::fallback::FallbackContext::new(
                    "router.load",
                    "guard_violation",
                    now_ms,
                )
                .thread_id(thread_id.clone())
                .error(&violation);
                let mut outcome = ProcessOutcome::detached("guard_violation_fallback", 0.0);
                outcome.thread_id = Some(thread_id);
                outcome.draft_messages.push(ctx.into_draft(
                    1,
                    "Thanks for your message - our team is reviewing your booking record and will reply personally.",
                    false,
                ));
                outcome.res = HilStatus { pending_hil_approval: true };
                return Ok(outcome);
            }
        }

        let filter = pre_filter(&msg, &body, event_ref);
        if filter.is_structural_attack {
            return self.quarantine(&mut store, msg, thread_id, client_id, now_ms);
        }

        let cancel = CancellationToken::new();
        let detection = match self
            .detect(&config, &msg, &body, event_ref.map(|e| e.current_step), &cancel)
            .await
        {
            Ok(detection) => detection,
            Err(err) => {
                return self.detection_fallback(&mut store, &msg, thread_id, now_ms, err);
            }
        };
        trace_bus().record(
            &thread_id,
            TraceKind::AgentPromptOut,
            None,
            "detection",
            json!({ "intent": detection.intent.to_string(), "confidence": detection.confidence }),
            now_ms,
        );

        let mut state = WorkflowState::new(msg.clone(), body, detection, config.clone(), now_ms, today);
        let mut actions: Vec<SmolStr> = Vec::new();
        let mut override_action: Option<SmolStr> = None;

        // Step 1 always runs.
        let mut last = {
            let mut ctx = StepContext {
                db: store.db_mut(),
                state: &mut state,
                calendar: self.deps.calendar.as_ref(),
                catalog: self.deps.catalog.as_ref(),
            };
            crate::steps::intake::process(&mut ctx)?
        };
        note_action(&mut actions, &mut override_action, &last);

        if !last.halt {
            self.apply_guards(&mut store, &mut state, &thread_id, now_ms);

            let step = state
                .event_idx
                .and_then(|i| store.db().events.get(i))
                .map(|e| e.current_step)
                .unwrap_or(1);
            if step >= 2 {
                trace_bus().record(
                    &thread_id,
                    TraceKind::StepEnter,
                    Some(step),
                    "dispatch",
                    json!(null),
                    now_ms,
                );
                let mut ctx = StepContext {
                    db: store.db_mut(),
                    state: &mut state,
                    calendar: self.deps.calendar.as_ref(),
                    catalog: self.deps.catalog.as_ref(),
                };
                last = (handler_for(step))(&mut ctx)?;
                note_action(&mut actions, &mut override_action, &last);
                trace_bus().record(
                    &thread_id,
                    TraceKind::StepExit,
                    Some(step),
                    last.action.as_str(),
                    json!(null),
                    now_ms,
                );
            }
        }

        self.verbalize_drafts(&mut state, &cancel).await;
        append_hybrid_qna(&mut state);
        let pending_hil = self.route_hil(&mut store, &mut state, now_ms);
        let action = override_action.unwrap_or_else(|| last.action.clone());

        if state.extras.persist {
            if let Some(event) = state.event_idx.and_then(|i| store.db_mut().events.get_mut(i)) {
                event.logs.push(format!("msg {} -> {}", msg.msg_id, action));
            }
            store.commit()?;
            trace_bus().record(&thread_id, TraceKind::DbWrite, None, "commit", json!(null), now_ms);
        }

        self.sessions.touch(
            &thread_id,
            SessionInfo {
                client_id: client_id.clone(),
                last_msg_id: msg.msg_id.clone(),
                last_seen_ms: now_ms,
            },
        );

        Ok(build_outcome(
            action,
            actions,
            &state,
            state.event_idx.and_then(|i| store.db().events.get(i)),
            pending_hil,
            last.payload.clone(),
        ))
    }

    async fn detect(
        &self,
        config: &Config,
        msg: &IncomingMessage,
        body: &str,
        current_step: Option<u8>,
        cancel: &CancellationToken,
    ) -> Result<UnifiedDetection, EngineError> {
        let req = DetectRequest {
            subject: &msg.subject,
            body,
            current_step: current_step.unwrap_or(1),
        };
        match config.detection_mode {
            DetectionMode::Unified => Ok(self
                .deps
                .providers
                .detect(&config.llm_provider, req, cancel)
                .await?),
            DetectionMode::Legacy => {
                let (intent, confidence) = self
                    .deps
                    .providers
                    .classify_intent(&config.llm_provider, req.clone(), cancel)
                    .await?;
                let entities = self
                    .deps
                    .providers
                    .extract_entities(&config.llm_provider, req, cancel)
                    .await?;
                let mut detection = UnifiedDetection::new(intent, confidence);
                detection.entities = entities;
                detection.signals = Signals {
                    is_confirmation: intent == Intent::ConfirmDate,
                    is_acceptance: intent == Intent::AcceptOffer,
                    is_rejection: matches!(intent, Intent::DeclineOffer | Intent::Cancellation),
                    is_change_request: intent == Intent::ChangeRequest,
                    is_manager_request: intent == Intent::ManagerRequest,
                    is_question: body.contains('?'),
                    has_urgency: false,
                };
                Ok(detection)
            }
        }
    }

    /// Structural attacks never reach a prompt: straight to manual review.
    fn quarantine(
        &self,
        store: &mut Store,
        msg: IncomingMessage,
        thread_id: String,
        client_id: String,
        now_ms: u64,
    ) -> Result<ProcessOutcome, EngineError> {
        warn!(msg_id = %msg.msg_id, "structural attack quarantined");
        let snippet: String = msg.body.chars().take(200).collect();
        let task = Task::new(TaskType::ManualReview, now_ms)
            .client_id(client_id)
            .context(format!("structural_attack; snippet={snippet}"));
        enqueue_task(store.db_mut(), task);
        store.commit()?;

        let mut outcome = ProcessOutcome::detached("manual_review_enqueued", 0.0);
        outcome.thread_id = Some(thread_id);
        outcome.draft_messages.push(
            Draft::new(
                1,
                "manual_review",
                "Thanks for your message. A member of our team will review it shortly.",
            )
            .with_workflow_footer("Team review", "Waiting on HIL"),
        );
        outcome.res = HilStatus { pending_hil_approval: true };
        Ok(outcome)
    }

    /// Total detection failure: visible fallback plus a review task, never a
    /// silent success.
    fn detection_fallback(
        &self,
        store: &mut Store,
        msg: &IncomingMessage,
        thread_id: String,
        now_ms: u64,
        err: EngineError,
    ) -> Result<ProcessOutcome, EngineError> {
        let task = Task::new(TaskType::ManualReview, now_ms)
            .client_id(msg.email_lower())
            .context(format!("detection failed: {err}"));
        enqueue_task(store.db_mut(), task);
        store.commit()?;

        let ctx = crate::fallback::FallbackContext::new("router.detect", err.trigger(), now_ms)
            .thread_id(thread_id.clone())
            .error(&err);
        let mut outcome = ProcessOutcome::detached("detection_fallback", 0.0);
        outcome.thread_id = Some(thread_id);
        outcome.draft_messages.push(ctx.into_draft(
            1,
            "Thanks for reaching out! We're having a brief technical hiccup on our side - a member of our team will pick this up personally.",
            false,
        ));
        outcome.res = HilStatus { pending_hil_approval: true };
        Ok(outcome)
    }

    /// Evaluate pre-route guards and apply the forced step unless a gate
    /// suppresses it.
    fn apply_guards(
        &self,
        store: &mut Store,
        state: &mut WorkflowState,
        thread_id: &str,
        now_ms: u64,
    ) {
        let Some(idx) = state.event_idx else {
            return;
        };
        let Some(event) = store.db().events.get(idx) else {
            return;
        };
        let mut snapshot = guards::evaluate(event);
        if snapshot.step2_required {
            snapshot.candidate_dates = self
                .deps
                .calendar
                .candidate_dates(self.clock.today(), 3)
                .into_iter()
                .map(to_ddmmyyyy)
                .collect();
        }
        let current = event.current_step;
        match snapshot.effective_forced_step(current) {
            Some(forced) => {
                trace_bus().record(
                    thread_id,
                    TraceKind::GateFail,
                    Some(current),
                    "guard_forced_step",
                    json!({ "forced_step": forced, "hash_changed": snapshot.requirements_hash_changed }),
                    now_ms,
                );
                if let Some(event) = store.db_mut().events.get_mut(idx) {
                    vd_storage::update_event_metadata(
                        event,
                        vd_storage::EventPatch::new().step(forced).reason("guard_forced_step"),
                        now_ms,
                    );
                }
                state.extras.persist = true;
            }
            None => {
                trace_bus().record(
                    thread_id,
                    TraceKind::GatePass,
                    Some(current),
                    "guards_clear",
                    json!({ "billing_flow": snapshot.billing_flow_active }),
                    now_ms,
                );
            }
        }
    }

    async fn verbalize_drafts(&self, state: &mut WorkflowState, cancel: &CancellationToken) {
        let jobs: Vec<_> = state.pending_verbalizations.drain(..).collect();
        for (idx, facts) in jobs {
            let Some(draft) = state.drafts.get(idx).cloned() else {
                continue;
            };
            let finalized = finalize_draft(
                &self.deps.providers,
                &state.config.llm_provider,
                &facts,
                draft,
                cancel,
            )
            .await;
            if let Some(slot) = state.drafts.get_mut(idx) {
                *slot = finalized;
            }
        }
    }

    /// Gate drafts behind the task queue. Returns whether anything awaits
    /// approval.
    fn route_hil(&self, store: &mut Store, state: &mut WorkflowState, now_ms: u64) -> bool {
        let hil_enabled = state.config.hil_mode.enabled && !state.extras.skip_hil;
        let event_id = state
            .event_idx
            .and_then(|i| store.db().events.get(i))
            .map(|e| e.event_id.clone());
        let mut pending = false;

        for draft in &mut state.drafts {
            let gated = if state.extras.skip_hil {
                false
            } else {
                draft.needs_hil(hil_enabled)
            };
            if !gated {
                trace_bus().record(
                    &state.thread_id,
                    TraceKind::DraftSend,
                    Some(draft.step),
                    draft.topic.as_str(),
                    json!(null),
                    now_ms,
                );
                continue;
            }
            draft.requires_approval = true;
            pending = true;
            let kind = match draft.topic.as_str() {
                "offer_sent" | "offer_manager_summary" => TaskType::OfferDraft,
                "transition_message" => TaskType::TransitionMessage,
                "offer_confirmation" | "final_contract_sent" => TaskType::ConfirmationMessage,
                _ => TaskType::ManualReview,
            };
            let mut task = Task::new(kind, now_ms)
                .client_id(state.client_id.clone())
                .draft(draft.clone());
            if let Some(event_id) = &event_id {
                task = task.event_id(event_id.clone());
            }
            let task_id = enqueue_task(store.db_mut(), task);
            state.extras.task_id = Some(task_id);
            state.extras.persist = true;
        }

        if pending {
            if let Some(event) = state.event_idx.and_then(|i| store.db_mut().events.get_mut(i)) {
                event.thread_state = ThreadState::WaitingOnHil;
            }
        }
        pending
    }

    fn note_config_version(&self, db_path: &Path, version: u64) {
        let mut versions = self.config_versions.lock();
        let entry = versions.entry(db_path.to_path_buf()).or_insert(version);
        if *entry != version {
            info!(old = *entry, new = version, "config version changed, cache refreshed");
            *entry = version;
        }
    }

    /// Terminal failure path: the original state is untouched (the lock was
    /// released with the store), the client still hears back.
    async fn failure_outcome(
        &self,
        msg: &IncomingMessage,
        db_path: &Path,
        err: EngineError,
    ) -> ProcessOutcome {
        let now_ms = self.clock.epoch_ms();
        warn!(error = %err, "process_msg failed, emitting fallback");

        // Best effort: record a review task; the store may be the broken
        // part.
        if let Ok(mut store) = open_store(db_path).await {
            let task = Task::new(TaskType::ManualReview, now_ms)
                .client_id(msg.email_lower())
                .context(format!("router failure: {err}"));
            enqueue_task(store.db_mut(), task);
            let _ = store.commit();
        }

        let ctx = crate::fallback::FallbackContext::new("router.process", err.trigger(), now_ms)
            .error(&err);
        let mut outcome = ProcessOutcome::detached("router_fallback", 0.0);
        outcome.draft_messages.push(ctx.into_draft(
            1,
            "We received your message but hit a snag processing it. Our team has been notified and will reply personally.",
            false,
        ));
        outcome.res = HilStatus { pending_hil_approval: true };
        outcome
    }
}

async fn open_store(db_path: &Path) -> Result<Store, EngineError> {
    let path = db_path.to_path_buf();
    tokio::task::spawn_blocking(move || Store::open(path))
        .await
        .map_err(|e| EngineError::Unexpected(format!("store task join: {e}")))?
        .map_err(EngineError::from)
}

fn note_action(
    actions: &mut Vec<SmolStr>,
    override_action: &mut Option<SmolStr>,
    result: &GroupResult,
) {
    actions.push(result.action.clone());
    let is_override =
        result.action == "smart_shortcut_to_offer" || result.action.ends_with("_detour");
    if is_override && override_action.is_none() {
        *override_action = Some(result.action.clone());
    }
}

/// Booking intent plus questions in one message: the house answer rides on
/// the primary draft instead of a second reply.
fn append_hybrid_qna(state: &mut WorkflowState) {
    let Some(reply) = state.extras.qna_reply.take() else {
        return;
    };
    if state.drafts.is_empty() {
        state.drafts.push(
            Draft::new(1, "qna_reply", reply)
                .with_workflow_footer("Awaiting your reply", "Awaiting Client"),
        );
        return;
    }
    if let Some(draft) = state.drafts.first_mut() {
        if draft.topic != "standalone_qna" {
            draft.body.push_str("\n\n");
            draft.body.push_str(&reply);
        }
    }
}

fn replay_outcome(event: &Event) -> ProcessOutcome {
    let mut outcome = ProcessOutcome::detached("duplicate_replay", 1.0);
    outcome.event_id = Some(event.event_id.clone());
    outcome.thread_id = Some(event.thread_id.clone());
    outcome.thread_state = event.thread_state;
    outcome.current_step = event.current_step;
    outcome.progress = progress_for_step(event.current_step);
    outcome
}

fn build_outcome(
    action: SmolStr,
    actions: Vec<SmolStr>,
    state: &WorkflowState,
    event: Option<&Event>,
    pending_hil: bool,
    payload: serde_json::Value,
) -> ProcessOutcome {
    let current_step = event.map(|e| e.current_step).unwrap_or(1);
    let dev_choice = (action == "dev_choice_required")
        .then(|| {
            let existing = payload.get("existing_event_id")?.as_str()?;
            Some(vd_wire::DevChoice {
                existing_event_id: vd_core::EventId::from_string(existing),
                current_step: payload
                    .get("current_step")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1) as u8,
                options: vec!["continue_existing".to_string(), "start_new".to_string()],
            })
        })
        .flatten();

    ProcessOutcome {
        action,
        event_id: event.map(|e| e.event_id.clone()),
        thread_id: Some(state.thread_id.clone()),
        intent: Some(state.intent()),
        confidence: state.confidence(),
        draft_messages: state.drafts.clone(),
        actions,
        thread_state: event.map(|e| e.thread_state).unwrap_or(ThreadState::AwaitingClient),
        current_step,
        progress: progress_for_step(current_step),
        res: HilStatus { pending_hil_approval: pending_hil },
        dev_choice,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
