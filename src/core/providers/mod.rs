//! Provider adapters: capability interfaces and the vendor glue behind them.
//!
//! The orchestration core only ever talks to these traits; vendor selection
//! happens once at startup through the `build_*` factories, driven by
//! configuration. No vendor name appears inside the core.

pub mod llm;
pub mod telephony;
pub mod transcription;
pub mod tts;

pub use llm::{LlmAdapter, LlmMessage, OpenAiChat};
pub use telephony::{TelephonyAdapter, TelnyxTelephony, decode_client_state, encode_client_state};
pub use transcription::{
    AssemblyAiTranscription, AudioSource, DeepgramTranscription, SubmitResult,
    TranscriptionAdapter, TranscriptionCheck,
};
pub use tts::{OpenAiSpeech, TtsAdapter};

use std::sync::Arc;
use thiserror::Error;

use crate::config::ServerConfig;

/// Provider-facing error classification. Only `Transient` errors are eligible
/// for retry; everything else resolves immediately.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network hiccup, timeout, rate limit, or provider 5xx. Retryable.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// The provider rejected the request; repeating it will not help.
    #[error("provider rejected request: {0}")]
    Permanent(String),

    /// The provider is down or misconfigured.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Classify a reqwest failure: timeouts and connection errors are
    /// transient, anything else permanent.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ProviderError::Transient(err.to_string())
        } else {
            ProviderError::Permanent(err.to_string())
        }
    }

    /// Classify an HTTP status from a provider response body.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.as_u16() == 429 || status.is_server_error() {
            ProviderError::Transient(format!("{status}: {body}"))
        } else {
            ProviderError::Permanent(format!("{status}: {body}"))
        }
    }
}

/// Outcome of an adapter health probe.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy { detail: String },
}

impl HealthStatus {
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        HealthStatus::Unhealthy {
            detail: detail.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            HealthStatus::Healthy => serde_json::json!({ "status": "healthy" }),
            HealthStatus::Unhealthy { detail } => {
                serde_json::json!({ "status": "unhealthy", "detail": detail })
            }
        }
    }
}

fn require_key(value: &Option<String>, name: &str) -> Result<String, ProviderError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Unavailable(format!("{name} is not configured")))
}

/// Build the telephony adapter selected by configuration.
pub fn build_telephony(config: &ServerConfig) -> Result<Arc<dyn TelephonyAdapter>, ProviderError> {
    match config.telephony_provider.as_str() {
        "telnyx" => {
            let api_key = require_key(&config.telnyx_api_key, "TELNYX_API_KEY")?;
            let connection_id = require_key(&config.telnyx_connection_id, "TELNYX_CONNECTION_ID")?;
            let from_number = require_key(&config.telephony_from_number, "TELEPHONY_FROM_NUMBER")?;
            Ok(Arc::new(TelnyxTelephony::new(
                api_key,
                connection_id,
                from_number,
                config.request_timeout(),
            )))
        }
        other => Err(ProviderError::Unavailable(format!(
            "unsupported telephony provider: {other}. Supported providers: telnyx"
        ))),
    }
}

/// Build the transcription adapter selected by configuration.
pub fn build_transcription(
    config: &ServerConfig,
) -> Result<Arc<dyn TranscriptionAdapter>, ProviderError> {
    match config.transcription_provider.as_str() {
        "assemblyai" => {
            let api_key = require_key(&config.assemblyai_api_key, "ASSEMBLYAI_API_KEY")?;
            Ok(Arc::new(AssemblyAiTranscription::new(
                api_key,
                config.request_timeout(),
            )))
        }
        "deepgram" => {
            let api_key = require_key(&config.deepgram_api_key, "DEEPGRAM_API_KEY")?;
            Ok(Arc::new(DeepgramTranscription::new(
                api_key,
                config.request_timeout(),
            )))
        }
        other => Err(ProviderError::Unavailable(format!(
            "unsupported transcription provider: {other}. Supported providers: assemblyai, deepgram"
        ))),
    }
}

/// Build the LLM adapter selected by configuration.
pub fn build_llm(config: &ServerConfig) -> Result<Arc<dyn LlmAdapter>, ProviderError> {
    match config.llm_provider.as_str() {
        "openai" => {
            let api_key = require_key(&config.openai_api_key, "OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAiChat::new(
                api_key,
                config.llm_model.clone(),
                config.request_timeout(),
            )))
        }
        other => Err(ProviderError::Unavailable(format!(
            "unsupported llm provider: {other}. Supported providers: openai"
        ))),
    }
}

/// Build the TTS adapter selected by configuration.
pub fn build_tts(config: &ServerConfig) -> Result<Arc<dyn TtsAdapter>, ProviderError> {
    match config.tts_provider.as_str() {
        "openai" => {
            let api_key = require_key(&config.openai_api_key, "OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAiSpeech::new(
                api_key,
                config.tts_model.clone(),
                config.tts_voice.clone(),
                config.request_timeout(),
            )))
        }
        other => Err(ProviderError::Unavailable(format!(
            "unsupported tts provider: {other}. Supported providers: openai"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Transient("timeout".into()).is_transient());
        assert!(!ProviderError::Permanent("bad request".into()).is_transient());
        assert!(!ProviderError::Unavailable("down".into()).is_transient());
    }

    #[test]
    fn status_classification() {
        let e = ProviderError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(e.is_transient());
        let e = ProviderError::from_status(reqwest::StatusCode::BAD_GATEWAY, String::new());
        assert!(e.is_transient());
        let e = ProviderError::from_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, String::new());
        assert!(!e.is_transient());
    }

    #[test]
    fn unknown_providers_are_rejected() {
        let mut config = ServerConfig::default();
        config.telephony_provider = "carrier-pigeon".to_string();
        assert!(build_telephony(&config).is_err());

        config.transcription_provider = "unknown".to_string();
        assert!(build_transcription(&config).is_err());
    }

    #[test]
    fn health_status_json_shape() {
        assert_eq!(
            HealthStatus::Healthy.to_json()["status"],
            serde_json::json!("healthy")
        );
        let unhealthy = HealthStatus::unhealthy("no route");
        assert_eq!(unhealthy.to_json()["status"], serde_json::json!("unhealthy"));
        assert_eq!(unhealthy.to_json()["detail"], serde_json::json!("no route"));
    }
}
