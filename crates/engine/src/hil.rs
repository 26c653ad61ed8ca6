// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HIL queue operations: approve, edit-then-approve, reject, resume.
//!
//! Approval records send metadata on the task and, for steps that expect a
//! continuation, feeds a synthetic `[CONTINUE_AFTER_APPROVAL]` message back
//! through the router once the store lock is released.

use crate::error::EngineError;
use crate::router::Engine;
use std::path::Path;
use tracing::info;
use vd_core::{Clock, IncomingMessage, TaskStatus, ThreadState};
use vd_storage::Store;
use vd_wire::ProcessOutcome;

/// Draft topics whose approval resumes the workflow.
const CONTINUATION_TOPICS: [&str; 3] =
    ["offer_confirmation", "transition_message", "final_contract_sent"];

/// Result of an approval.
#[derive(Debug)]
pub struct ApprovalResult {
    pub sent_body: String,
    /// Outcome of the resumed workflow cycle, when the step expected one.
    pub resumed: Option<ProcessOutcome>,
}

impl<C: Clock> Engine<C> {
    /// Approve a pending task (optionally with an edited body), record send
    /// metadata, and resume the workflow when the draft topic expects it.
    pub async fn approve_task(
        &self,
        task_id: &str,
        db_path: &Path,
        edited_body: Option<String>,
    ) -> Result<ApprovalResult, EngineError> {
        let now_ms = self.clock_ms();
        let (sent_body, continuation) = {
            let mut store = open(db_path).await?;
            let task = store
                .db_mut()
                .tasks
                .iter_mut()
                .find(|t| t.task_id == *task_id)
                .ok_or_else(|| {
                    EngineError::PayloadInvalid(format!("unknown task: {task_id}"))
                })?;
            if task.status != TaskStatus::Pending {
                return Err(EngineError::ConcurrentConflict(format!(
                    "task {task_id} already {}",
                    task.status
                )));
            }

            let draft_body = task.draft.as_ref().map(|d| d.body.clone()).unwrap_or_default();
            let edited = edited_body.is_some();
            let sent_body = edited_body.unwrap_or(draft_body);
            task.approve(sent_body.clone(), now_ms, edited);
            let topic = task.draft.as_ref().map(|d| d.topic.clone());
            let task_event_id = task.event_id.clone();

            let continuation = topic
                .as_deref()
                .filter(|t| CONTINUATION_TOPICS.contains(t))
                .and_then(|_| {
                    let event_id = task_event_id?;
                    let event = store
                        .db()
                        .events
                        .iter()
                        .find(|e| e.event_id == event_id)?;
                    Some((event.client_id.clone(), event.thread_id.clone()))
                });

            store.commit()?;
            info!(task_id, edited, "task approved");
            (sent_body, continuation)
            // Lock released here; the resumed cycle re-acquires it.
        };

        let resumed = match continuation {
            Some((client_id, thread_id)) => {
                let mut msg = IncomingMessage::continuation(
                    format!("hil-{task_id}-{now_ms}"),
                    client_id,
                    String::new(),
                );
                msg.thread_id = Some(thread_id);
                Some(self.process_msg(msg, db_path).await)
            }
            None => None,
        };

        Ok(ApprovalResult { sent_body, resumed })
    }

    /// Reject a pending task; the draft is discarded and the thread returns
    /// to the client.
    pub async fn reject_task(&self, task_id: &str, db_path: &Path) -> Result<(), EngineError> {
        let now_ms = self.clock_ms();
        let mut store = open(db_path).await?;
        let event_id = {
            let task = store
                .db_mut()
                .tasks
                .iter_mut()
                .find(|t| t.task_id == *task_id)
                .ok_or_else(|| {
                    EngineError::PayloadInvalid(format!("unknown task: {task_id}"))
                })?;
            if task.status != TaskStatus::Pending {
                return Err(EngineError::ConcurrentConflict(format!(
                    "task {task_id} already {}",
                    task.status
                )));
            }
            task.reject(now_ms);
            task.event_id.clone()
        };
        if let Some(event_id) = event_id {
            if let Some(event) =
                store.db_mut().events.iter_mut().find(|e| e.event_id == event_id)
            {
                event.thread_state = ThreadState::AwaitingClient;
            }
        }
        store.commit()?;
        info!(task_id, "task rejected");
        Ok(())
    }
}

async fn open(db_path: &Path) -> Result<Store, EngineError> {
    let path = db_path.to_path_buf();
    tokio::task::spawn_blocking(move || Store::open(path))
        .await
        .map_err(|e| EngineError::Unexpected(format!("store task join: {e}")))?
        .map_err(EngineError::from)
}

#[cfg(test)]
#[path = "hil_tests.rs"]
mod tests;
