//! Text-to-speech capability interface and the OpenAI speech adapter.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use std::time::Duration;

use super::{HealthStatus, ProviderError};
use crate::core::pipeline::VoiceStyle;

#[async_trait]
pub trait TtsAdapter: Send + Sync {
    /// Convert text to speech, steering vocal affect with the style's
    /// natural-language instruction.
    async fn synthesize(&self, text: &str, style: &VoiceStyle) -> Result<Bytes, ProviderError>;

    async fn list_voices(&self) -> Result<Vec<String>, ProviderError>;

    async fn health_check(&self) -> HealthStatus;
}

/// OpenAI speech synthesis adapter.
pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    model: String,
    voice: String,
    base_url: String,
}

impl OpenAiSpeech {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TtsAdapter for OpenAiSpeech {
    async fn synthesize(&self, text: &str, style: &VoiceStyle) -> Result<Bytes, ProviderError> {
        if text.is_empty() {
            return Err(ProviderError::Permanent("text cannot be empty".into()));
        }

        let url = format!("{}/audio/speech", self.base_url);
        let body = json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "instructions": style.instruction(),
            "response_format": "mp3",
        });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        resp.bytes().await.map_err(ProviderError::from_reqwest)
    }

    async fn list_voices(&self) -> Result<Vec<String>, ProviderError> {
        // The speech endpoint exposes a fixed voice set rather than a listing API.
        Ok(vec![
            "alloy".to_string(),
            "ash".to_string(),
            "coral".to_string(),
            "echo".to_string(),
            "fable".to_string(),
            "nova".to_string(),
            "onyx".to_string(),
            "sage".to_string(),
            "shimmer".to_string(),
        ])
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy,
            Ok(resp) => HealthStatus::unhealthy(format!("tts API returned {}", resp.status())),
            Err(e) => HealthStatus::unhealthy(format!("tts unreachable: {e}")),
        }
    }
}
