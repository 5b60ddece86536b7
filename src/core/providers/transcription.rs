//! Transcription capability interface and vendor adapters.
//!
//! Two provider shapes exist behind the same trait: submit-then-poll
//! providers (AssemblyAI) and synchronous providers that return completed
//! text straight from `submit` (Deepgram pre-recorded). The reconciler
//! supports both without the call state machine knowing which is in play.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use std::time::Duration;

use super::{HealthStatus, ProviderError};

/// Raw audio bytes or a retrievable URL.
#[derive(Debug, Clone)]
pub enum AudioSource {
    Url(String),
    Bytes(Bytes),
}

impl AudioSource {
    pub fn is_empty(&self) -> bool {
        match self {
            AudioSource::Url(url) => url.trim().is_empty(),
            AudioSource::Bytes(bytes) => bytes.is_empty(),
        }
    }
}

/// What came back from a submit call.
#[derive(Debug, Clone)]
pub enum SubmitResult {
    /// Asynchronous provider: poll `job_ref` until resolution.
    Queued { job_ref: String },
    /// Synchronous provider: the text is already here.
    Completed { text: String },
}

/// Status of an in-flight provider job.
#[derive(Debug, Clone)]
pub enum TranscriptionCheck {
    Pending,
    Completed { text: String },
    Failed { detail: String },
}

#[async_trait]
pub trait TranscriptionAdapter: Send + Sync {
    async fn submit(&self, audio: &AudioSource) -> Result<SubmitResult, ProviderError>;

    /// Query job status. Never called for jobs that resolved at submit time.
    async fn check(&self, job_ref: &str) -> Result<TranscriptionCheck, ProviderError>;

    /// Whether `submit` resolves terminally without polling.
    fn is_synchronous(&self) -> bool {
        false
    }

    async fn health_check(&self) -> HealthStatus;
}

/// AssemblyAI v2 adapter (asynchronous submit-then-poll shape).
pub struct AssemblyAiTranscription {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AssemblyAiTranscription {
    pub fn new(api_key: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: "https://api.assemblyai.com/v2".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Raw bytes must be uploaded first; the upload URL then feeds the
    /// transcript request.
    async fn upload(&self, bytes: &Bytes) -> Result<String, ProviderError> {
        let url = format!("{}/upload", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes.clone())
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        let payload: Value = resp.json().await.map_err(ProviderError::from_reqwest)?;
        payload["upload_url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Permanent("upload response missing upload_url".into()))
    }
}

#[async_trait]
impl TranscriptionAdapter for AssemblyAiTranscription {
    async fn submit(&self, audio: &AudioSource) -> Result<SubmitResult, ProviderError> {
        let audio_url = match audio {
            AudioSource::Url(url) => url.clone(),
            AudioSource::Bytes(bytes) => self.upload(bytes).await?,
        };

        let url = format!("{}/transcript", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "audio_url": audio_url }))
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        let payload: Value = resp.json().await.map_err(ProviderError::from_reqwest)?;
        let job_ref = payload["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Permanent("transcript response missing id".into()))?;
        Ok(SubmitResult::Queued { job_ref })
    }

    async fn check(&self, job_ref: &str) -> Result<TranscriptionCheck, ProviderError> {
        let url = format!("{}/transcript/{}", self.base_url, job_ref);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        let payload: Value = resp.json().await.map_err(ProviderError::from_reqwest)?;
        match payload["status"].as_str().unwrap_or("") {
            "completed" => Ok(TranscriptionCheck::Completed {
                text: payload["text"].as_str().unwrap_or("").to_string(),
            }),
            "error" => Ok(TranscriptionCheck::Failed {
                detail: payload["error"].as_str().unwrap_or("unknown error").to_string(),
            }),
            _ => Ok(TranscriptionCheck::Pending),
        }
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/transcript", self.base_url);
        match self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await
        {
            Ok(resp) if resp.status().as_u16() == 401 => {
                HealthStatus::unhealthy("transcription credentials rejected")
            }
            Ok(resp) if resp.status().is_server_error() => {
                HealthStatus::unhealthy(format!("transcription API returned {}", resp.status()))
            }
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::unhealthy(format!("transcription unreachable: {e}")),
        }
    }
}

/// Deepgram pre-recorded adapter (synchronous shape): the transcript comes
/// back in the submit response, so jobs resolve terminally at submit time.
pub struct DeepgramTranscription {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepgramTranscription {
    pub fn new(api_key: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: "https://api.deepgram.com/v1".to_string(),
            model: "nova-2".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_transcript(payload: &Value) -> Option<String> {
        payload["results"]["channels"][0]["alternatives"][0]["transcript"]
            .as_str()
            .map(str::to_string)
    }
}

#[async_trait]
impl TranscriptionAdapter for DeepgramTranscription {
    async fn submit(&self, audio: &AudioSource) -> Result<SubmitResult, ProviderError> {
        let url = format!("{}/listen?model={}&smart_format=true", self.base_url, self.model);
        let request = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Token {}", self.api_key));

        let request = match audio {
            AudioSource::Url(audio_url) => request
                .header(CONTENT_TYPE, "application/json")
                .json(&json!({ "url": audio_url })),
            AudioSource::Bytes(bytes) => request
                .header(CONTENT_TYPE, "audio/mpeg")
                .body(bytes.clone()),
        };

        let resp = request.send().await.map_err(ProviderError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let payload: Value = resp.json().await.map_err(ProviderError::from_reqwest)?;
        let text = Self::parse_transcript(&payload)
            .ok_or_else(|| ProviderError::Permanent("response missing transcript".into()))?;
        Ok(SubmitResult::Completed { text })
    }

    async fn check(&self, job_ref: &str) -> Result<TranscriptionCheck, ProviderError> {
        // Jobs resolve at submit time; the reconciler short-circuits terminal
        // jobs before polling, so this is unreachable in practice.
        Err(ProviderError::Permanent(format!(
            "pre-recorded job {job_ref} is not pollable"
        )))
    }

    fn is_synchronous(&self) -> bool {
        true
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/projects", self.base_url);
        match self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) if resp.status().as_u16() == 401 => {
                HealthStatus::unhealthy("transcription credentials rejected")
            }
            Ok(resp) if resp.status().is_server_error() => {
                HealthStatus::unhealthy(format!("transcription API returned {}", resp.status()))
            }
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::unhealthy(format!("transcription unreachable: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_audio_detection() {
        assert!(AudioSource::Url("  ".to_string()).is_empty());
        assert!(AudioSource::Bytes(Bytes::new()).is_empty());
        assert!(!AudioSource::Url("https://cdn.example.com/rec.mp3".to_string()).is_empty());
        assert!(!AudioSource::Bytes(Bytes::from_static(b"\x00")).is_empty());
    }

    #[test]
    fn deepgram_transcript_extraction() {
        let payload = json!({
            "results": { "channels": [ { "alternatives": [ { "transcript": "good morning" } ] } ] }
        });
        assert_eq!(
            DeepgramTranscription::parse_transcript(&payload).as_deref(),
            Some("good morning")
        );
        assert!(DeepgramTranscription::parse_transcript(&json!({})).is_none());
    }
}
