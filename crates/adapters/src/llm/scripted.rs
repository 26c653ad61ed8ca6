// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted provider for tests: returns queued detections, optionally
//! failing a set number of calls first, and records what it was asked.

use super::{AdapterError, DetectRequest, LlmProvider, VerbalizeFacts};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use vd_core::{Entities, Intent, UnifiedDetection};

#[derive(Default)]
pub struct ScriptedLlm {
    detections: Mutex<VecDeque<UnifiedDetection>>,
    failures_remaining: Mutex<usize>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a detection to return on the next call.
    pub fn push_detection(&self, detection: UnifiedDetection) {
        self.detections.lock().push_back(detection);
    }

    /// Make the next `n` calls fail with `Unavailable`.
    pub fn fail_next(&self, n: usize) {
        *self.failures_remaining.lock() = n;
    }

    /// Bodies of every call seen so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn take(&self, body: &str) -> Result<UnifiedDetection, AdapterError> {
        self.calls.lock().push(body.to_string());
        {
            let mut failures = self.failures_remaining.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(AdapterError::Unavailable("scripted failure".to_string()));
            }
        }
        self.detections
            .lock()
            .pop_front()
            .ok_or_else(|| AdapterError::InvalidPayload("script exhausted".to_string()))
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn detect(&self, req: DetectRequest<'_>) -> Result<UnifiedDetection, AdapterError> {
        self.take(req.body)
    }

    async fn classify_intent(
        &self,
        req: DetectRequest<'_>,
    ) -> Result<(Intent, f64), AdapterError> {
        self.take(req.body).map(|d| (d.intent, d.confidence))
    }

    async fn extract_entities(&self, req: DetectRequest<'_>) -> Result<Entities, AdapterError> {
        self.take(req.body).map(|d| d.entities)
    }

    async fn verbalize(&self, _facts: &VerbalizeFacts) -> Result<String, AdapterError> {
        self.calls.lock().push("<verbalize>".to_string());
        Ok("scripted prose".to_string())
    }
}
