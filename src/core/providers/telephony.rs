//! Telephony capability interface and the Telnyx Call Control adapter.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::{HealthStatus, ProviderError};

/// Capability interface for the telephony provider.
///
/// Every command is idempotent from the orchestrator's perspective: repeating
/// a command for an already-terminated call is a no-op, not an error.
#[async_trait]
pub trait TelephonyAdapter: Send + Sync {
    /// Place an outbound call. Returns the provider call control id.
    async fn place_call(&self, to: &str) -> Result<String, ProviderError>;

    async fn play_audio(
        &self,
        call_control_id: &str,
        url: &str,
        client_state: &str,
    ) -> Result<(), ProviderError>;

    async fn start_recording(
        &self,
        call_control_id: &str,
        client_state: &str,
    ) -> Result<(), ProviderError>;

    async fn stop_recording(&self, call_control_id: &str) -> Result<(), ProviderError>;

    async fn hangup(&self, call_control_id: &str) -> Result<(), ProviderError>;

    /// Send an SMS to a number.
    async fn send_message(&self, to: &str, text: &str) -> Result<(), ProviderError>;

    async fn health_check(&self) -> HealthStatus;
}

/// Telnyx requires `client_state` to be base64; callbacks echo it encoded.
pub fn encode_client_state(client_state: &str) -> String {
    BASE64.encode(client_state.as_bytes())
}

/// Decode an echoed `client_state`. Tokens that are not valid base64 pass
/// through untouched so hand-crafted test payloads still correlate.
pub fn decode_client_state(raw: &str) -> String {
    BASE64
        .decode(raw.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// Telnyx Call Control v2 adapter.
pub struct TelnyxTelephony {
    client: Client,
    api_key: String,
    connection_id: String,
    from_number: String,
    base_url: String,
}

impl TelnyxTelephony {
    pub fn new(
        api_key: impl Into<String>,
        connection_id: impl Into<String>,
        from_number: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            connection_id: connection_id.into(),
            from_number: from_number.into(),
            base_url: "https://api.telnyx.com/v2".to_string(),
        }
    }

    /// Override the API base URL. Used by tests pointing at a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Issue a call-control action. Telnyx answers 404/422 for calls that
    /// have already terminated; per the adapter contract those map to Ok.
    async fn call_action(
        &self,
        call_control_id: &str,
        action: &str,
        body: Value,
    ) -> Result<(), ProviderError> {
        let url = format!(
            "{}/calls/{}/actions/{}",
            self.base_url, call_control_id, action
        );
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 404 || status.as_u16() == 422 {
            debug!(call_control_id, action, %status, "command for terminated call, treating as no-op");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ProviderError::from_status(status, body))
    }
}

#[async_trait]
impl TelephonyAdapter for TelnyxTelephony {
    async fn place_call(&self, to: &str) -> Result<String, ProviderError> {
        let url = format!("{}/calls", self.base_url);
        let body = json!({
            "connection_id": self.connection_id,
            "to": to,
            "from": self.from_number,
        });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
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
        payload["data"]["call_control_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Permanent("call response missing call_control_id".to_string())
            })
    }

    async fn play_audio(
        &self,
        call_control_id: &str,
        url: &str,
        client_state: &str,
    ) -> Result<(), ProviderError> {
        self.call_action(
            call_control_id,
            "playback_start",
            json!({
                "audio_url": url,
                "client_state": encode_client_state(client_state),
            }),
        )
        .await
    }

    async fn start_recording(
        &self,
        call_control_id: &str,
        client_state: &str,
    ) -> Result<(), ProviderError> {
        self.call_action(
            call_control_id,
            "record_start",
            json!({
                "format": "mp3",
                "channels": "single",
                "client_state": encode_client_state(client_state),
            }),
        )
        .await
    }

    async fn stop_recording(&self, call_control_id: &str) -> Result<(), ProviderError> {
        self.call_action(call_control_id, "record_stop", json!({}))
            .await
    }

    async fn hangup(&self, call_control_id: &str) -> Result<(), ProviderError> {
        self.call_action(call_control_id, "hangup", json!({})).await
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        let url = format!("{}/messages", self.base_url);
        let body = json!({
            "from": self.from_number,
            "to": to,
            "text": text,
        });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ProviderError::from_status(status, body))
        }
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/calls", self.base_url);
        match self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
        {
            Ok(resp) if resp.status().as_u16() == 401 => {
                HealthStatus::unhealthy("telephony credentials rejected")
            }
            Ok(resp) if resp.status().is_server_error() => {
                HealthStatus::unhealthy(format!("telephony API returned {}", resp.status()))
            }
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::unhealthy(format!("telephony unreachable: {e}")),
        }
    }
}
