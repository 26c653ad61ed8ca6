// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM provider abstraction.
//!
//! Three operations — detection, legacy intent/entity extraction, and
//! verbalization — each routed per-operation to {primary, fallback, stub}.
//! The router retries exactly once on the alternate provider; retries beyond
//! that are the caller's problem.

pub(crate) mod router;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;
mod stub;

pub use router::{init_providers, providers, reset_providers, ProviderRouter};
pub use stub::StubLlm;

use async_trait::async_trait;
use thiserror::Error;
use vd_core::{Entities, Intent, UnifiedDetection};

/// Errors from provider calls.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider rate limited")]
    RateLimited,
    #[error("provider auth failed: {0}")]
    AuthFailed(String),
    #[error("provider call timed out")]
    Timeout,
    #[error("provider returned invalid payload: {0}")]
    InvalidPayload(String),
    #[error("call cancelled")]
    Cancelled,
}

impl AdapterError {
    /// Whether the alternate provider is worth one attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AdapterError::Cancelled)
    }
}

/// Input to a detection call. The body arrives pre-stripped of quoted reply
/// history.
#[derive(Debug, Clone)]
pub struct DetectRequest<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    pub current_step: u8,
}

/// Structured facts handed to the verbalizer.
#[derive(Debug, Clone, Default)]
pub struct VerbalizeFacts {
    pub date: Option<String>,
    pub room: Option<String>,
    pub participants: Option<u32>,
    pub amount: Option<f64>,
    pub line_items: Vec<(String, f64)>,
    pub deposit: Option<f64>,
    pub billing: Option<String>,
}

/// A single LLM backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Unified mode: one call extracts intent, signals, and entities.
    async fn detect(&self, req: DetectRequest<'_>) -> Result<UnifiedDetection, AdapterError>;

    /// Legacy mode, first call: intent and confidence only.
    async fn classify_intent(&self, req: DetectRequest<'_>) -> Result<(Intent, f64), AdapterError>;

    /// Legacy mode, second call: entities only.
    async fn extract_entities(&self, req: DetectRequest<'_>) -> Result<Entities, AdapterError>;

    /// Wrap structured facts into client-facing prose.
    async fn verbalize(&self, facts: &VerbalizeFacts) -> Result<String, AdapterError>;
}
