// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-operation provider routing with single-fallback retry.
//!
//! Each operation (intent, entity, verbalization) independently picks its
//! provider from config. A failed call gets exactly one attempt on the
//! alternate provider; the adapter layer never retries beyond that. Every
//! call runs under a deadline and the caller's cancellation token.

use super::{AdapterError, DetectRequest, LlmProvider, StubLlm, VerbalizeFacts};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vd_core::{Entities, Intent, LlmProviderConfig, ProviderKind, UnifiedDetection};

/// Default per-call deadline.
pub const CALL_DEADLINE: Duration = Duration::from_secs(20);

/// Routes operations to providers and applies the fallback policy.
pub struct ProviderRouter {
    primary: Arc<dyn LlmProvider>,
    fallback: Arc<dyn LlmProvider>,
    stub: Arc<dyn LlmProvider>,
    deadline: Duration,
}

impl ProviderRouter {
    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback: Arc<dyn LlmProvider>,
    ) -> Self {
        Self { primary, fallback, stub: Arc::new(StubLlm), deadline: CALL_DEADLINE }
    }

    /// Router backed entirely by the deterministic stub.
    pub fn stub_only() -> Self {
        Self::new(Arc::new(StubLlm), Arc::new(StubLlm))
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn select(&self, kind: ProviderKind) -> &Arc<dyn LlmProvider> {
        match kind {
            ProviderKind::Primary => &self.primary,
            ProviderKind::Fallback => &self.fallback,
            ProviderKind::Stub => &self.stub,
        }
    }

    /// The one alternate tried after a failure. The stub has no alternate.
    fn alternate(&self, kind: ProviderKind) -> &Arc<dyn LlmProvider> {
        match kind {
            ProviderKind::Primary => &self.fallback,
            ProviderKind::Fallback => &self.primary,
            ProviderKind::Stub => &self.stub,
        }
    }

    async fn bounded<T, F>(&self, cancel: &CancellationToken, fut: F) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, AdapterError>>,
    {
        tokio::select! {
            _ = cancel.cancelled() => Err(AdapterError::Cancelled),
            outcome = tokio::time::timeout(self.deadline, fut) => match outcome {
                Ok(result) => result,
                Err(_) => Err(AdapterError::Timeout),
            },
        }
    }

    /// Unified detection via the intent-provider route.
    pub async fn detect(
        &self,
        routing: &LlmProviderConfig,
        req: DetectRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<UnifiedDetection, AdapterError> {
        let kind = routing.intent_provider;
        let first = self.select(kind);
        match self.bounded(cancel, first.detect(req.clone())).await {
            Ok(detection) => Ok(detection),
            Err(err) if err.is_retryable() => {
                warn!(provider = first.name(), error = %err, "detect failed, trying alternate");
                let second = self.alternate(kind);
                self.bounded(cancel, second.detect(req)).await
            }
            Err(err) => Err(err),
        }
    }

    /// Legacy-mode intent classification.
    pub async fn classify_intent(
        &self,
        routing: &LlmProviderConfig,
        req: DetectRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<(Intent, f64), AdapterError> {
        let kind = routing.intent_provider;
        let first = self.select(kind);
        match self.bounded(cancel, first.classify_intent(req.clone())).await {
            Ok(result) => Ok(result),
            Err(err) if err.is_retryable() => {
                warn!(provider = first.name(), error = %err, "intent failed, trying alternate");
                let second = self.alternate(kind);
                self.bounded(cancel, second.classify_intent(req)).await
            }
            Err(err) => Err(err),
        }
    }

    /// Legacy-mode entity extraction.
    pub async fn extract_entities(
        &self,
        routing: &LlmProviderConfig,
        req: DetectRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Entities, AdapterError> {
        let kind = routing.entity_provider;
        let first = self.select(kind);
        match self.bounded(cancel, first.extract_entities(req.clone())).await {
            Ok(entities) => Ok(entities),
            Err(err) if err.is_retryable() => {
                warn!(provider = first.name(), error = %err, "entities failed, trying alternate");
                let second = self.alternate(kind);
                self.bounded(cancel, second.extract_entities(req)).await
            }
            Err(err) => Err(err),
        }
    }

    /// Verbalization via its own route.
    pub async fn verbalize(
        &self,
        routing: &LlmProviderConfig,
        facts: &VerbalizeFacts,
        cancel: &CancellationToken,
    ) -> Result<String, AdapterError> {
        let kind = routing.verbalization_provider;
        let first = self.select(kind);
        match self.bounded(cancel, first.verbalize(facts)).await {
            Ok(prose) => Ok(prose),
            Err(err) if err.is_retryable() => {
                warn!(provider = first.name(), error = %err, "verbalize failed, trying alternate");
                let second = self.alternate(kind);
                self.bounded(cancel, second.verbalize(facts)).await
            }
            Err(err) => Err(err),
        }
    }
}

// Process-wide router singleton. Lazily constructed (stub-backed) on first
// use; tests swap it via init_providers/reset_providers.
static ROUTER: Mutex<Option<Arc<ProviderRouter>>> = Mutex::new(None);

/// Install the process-wide router (startup or tests).
pub fn init_providers(router: Arc<ProviderRouter>) {
    *ROUTER.lock() = Some(router);
}

/// The process-wide router, lazily defaulting to stub-only.
pub fn providers() -> Arc<ProviderRouter> {
    let mut guard = ROUTER.lock();
    guard.get_or_insert_with(|| Arc::new(ProviderRouter::stub_only())).clone()
}

/// Reset hook for tests.
pub fn reset_providers() {
    *ROUTER.lock() = None;
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
