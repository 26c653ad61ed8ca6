// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error kinds.

use thiserror::Error;
use vd_adapters::AdapterError;
use vd_core::InvariantViolation;
use vd_storage::StoreError;

/// Errors surfaced by the workflow runtime. The router converts every one of
/// these into a visible fallback reply; none may vanish silently.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("provider rate limited")]
    ProviderRateLimited,
    #[error("provider auth failed: {0}")]
    ProviderAuthFailed(String),
    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("guard violation: {0}")]
    GuardViolation(#[from] InvariantViolation),
    #[error("invalid payload: {0}")]
    PayloadInvalid(String),
    #[error("concurrent conflict: {0}")]
    ConcurrentConflict(String),
    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl From<AdapterError> for EngineError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::RateLimited => EngineError::ProviderRateLimited,
            AdapterError::AuthFailed(msg) => EngineError::ProviderAuthFailed(msg),
            AdapterError::InvalidPayload(msg) => EngineError::PayloadInvalid(msg),
            AdapterError::Unavailable(msg) => EngineError::ProviderUnavailable(msg),
            AdapterError::Timeout => EngineError::ProviderUnavailable("timeout".to_string()),
            AdapterError::Cancelled => EngineError::ProviderUnavailable("cancelled".to_string()),
        }
    }
}

impl EngineError {
    /// Short machine tag used in fallback-context records.
    pub fn trigger(&self) -> &'static str {
        match self {
            EngineError::ProviderUnavailable(_) => "provider_unavailable",
            EngineError::ProviderRateLimited => "provider_rate_limited",
            EngineError::ProviderAuthFailed(_) => "provider_auth_failed",
            EngineError::PersistenceFailed(_) => "persistence_failed",
            EngineError::ValidationFailed(_) => "validation_failed",
            EngineError::GuardViolation(_) => "guard_violation",
            EngineError::PayloadInvalid(_) => "payload_invalid",
            EngineError::ConcurrentConflict(_) => "concurrent_conflict",
            EngineError::Unexpected(_) => "unexpected_exception",
        }
    }
}
