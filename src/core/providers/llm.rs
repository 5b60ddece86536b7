//! Language-model capability interface and the OpenAI chat adapter.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

use super::{HealthStatus, ProviderError};

/// One message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Complete the conversation, returning the assistant reply text.
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, ProviderError>;

    async fn health_check(&self) -> HealthStatus;
}

/// OpenAI chat completions adapter.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChat {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LlmAdapter for OpenAiChat {
    async fn complete(&self, messages: &[LlmMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
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

        let payload: Value = resp.json().await.map_err(ProviderError::from_reqwest)?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ProviderError::Permanent("completion response missing content".into()))
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
            Ok(resp) => HealthStatus::unhealthy(format!("llm API returned {}", resp.status())),
            Err(e) => HealthStatus::unhealthy(format!("llm unreachable: {e}")),
        }
    }
}
