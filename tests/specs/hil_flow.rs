// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HIL gating end-to-end: gated drafts become tasks, approval resumes the
//! workflow, rejection hands the thread back to the client.

use crate::support::{db_path, engine, msg, read_event};
use vd_core::ThreadState;
use vd_storage::Store;

fn enable_hil(path: &std::path::Path) {
    let mut store = Store::open(path).unwrap();
    let mut config = store.config().clone();
    config.hil_mode.enabled = true;
    store.save_config(config);
    store.commit().unwrap();
}

#[tokio::test]
async fn gated_offer_is_held_and_sent_on_approval() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    enable_hil(&path);
    let eng = engine();

    let outcome = eng
        .process_msg(msg("m1", "We'd like Room A on 15.04.2026 for 30 guests"), &path)
        .await;
    assert!(outcome.res.pending_hil_approval);

    let task_id = {
        let db = Store::read(&path).unwrap();
        assert_eq!(read_event(&path).thread_state, ThreadState::WaitingOnHil);
        db.tasks
            .iter()
            .find(|t| t.draft.as_ref().is_some_and(|d| d.topic == "offer_sent"))
            .map(|t| t.task_id.to_string())
            .expect("offer task queued")
    };

    let result = eng.approve_task(&task_id, &path, None).await.unwrap();
    assert!(!result.sent_body.is_empty());
    // offer_sent is not a continuation topic; no resume expected
    assert!(result.resumed.is_none());

    let db = Store::read(&path).unwrap();
    let task = db.tasks.iter().find(|t| t.task_id.to_string() == task_id).unwrap();
    assert!(task.sent_at_ms.is_some());
}

#[tokio::test]
async fn no_gated_topic_autosends_while_hil_is_on() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    enable_hil(&path);

    let outcome = engine()
        .process_msg(msg("m1", "We'd like Room A on 15.04.2026 for 30 guests"), &path)
        .await;

    for draft in &outcome.draft_messages {
        if vd_core::HIL_GATED_TOPICS.contains(&draft.topic.as_str()) {
            assert!(
                draft.requires_approval,
                "gated topic {} must not auto-send",
                draft.topic
            );
        }
    }
}

#[tokio::test]
async fn rejection_returns_thread_to_client() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    enable_hil(&path);
    let eng = engine();

    let _ = eng
        .process_msg(msg("m1", "We'd like Room A on 15.04.2026 for 30 guests"), &path)
        .await;
    let task_id = Store::read(&path)
        .unwrap()
        .tasks
        .first()
        .map(|t| t.task_id.to_string())
        .unwrap();

    eng.reject_task(&task_id, &path).await.unwrap();
    assert_eq!(read_event(&path).thread_state, ThreadState::AwaitingClient);
}
