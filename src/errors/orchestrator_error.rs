use thiserror::Error;

use crate::core::providers::ProviderError;
use crate::core::store::StoreError;

/// Errors surfaced by the call orchestration core.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// An event arrived for a call with no stored state.
    #[error("no active call for id {0}")]
    UnknownCall(String),

    /// A callback that no longer matches the call's pending work. Always
    /// safe to drop: the canonical state has already moved on.
    #[error("stale callback for call {call_control_id}: {detail}")]
    StaleCallback {
        call_control_id: String,
        detail: String,
    },

    /// A transcription job resolved to an error status.
    #[error("transcription job {job_id} failed: {detail}")]
    TranscriptionFailed { job_id: String, detail: String },

    /// A provider could not be reached even after retries.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The event or request itself is malformed.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ProviderError> for OrchestratorError {
    fn from(err: ProviderError) -> Self {
        OrchestratorError::ProviderUnavailable(err.to_string())
    }
}
