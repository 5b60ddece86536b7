//! Inbound webhook handlers.
//!
//! These translate vendor payloads into [`CallEvent`]s and hand them to the
//! orchestrator. Events the flow does not care about acknowledge with 200 so
//! the provider stops redelivering them; stale or duplicate events degrade to
//! no-ops inside the orchestrator rather than error responses here.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::call::CallEvent;
use crate::core::providers::decode_client_state;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TelephonyWebhook {
    pub data: TelephonyWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct TelephonyWebhookData {
    pub event_type: String,
    #[serde(default)]
    pub payload: TelephonyWebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelephonyWebhookPayload {
    #[serde(default)]
    pub call_control_id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub client_state: Option<String>,
    #[serde(default)]
    pub recording_urls: Option<RecordingUrls>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordingUrls {
    #[serde(default)]
    pub mp3: Option<String>,
}

impl TelephonyWebhookPayload {
    /// The user's number: the dialed party on outbound calls, the caller
    /// otherwise.
    fn user_number(&self) -> Option<String> {
        if self.direction.as_deref() == Some("outgoing") {
            self.to.clone().or_else(|| self.from.clone())
        } else {
            self.from.clone().or_else(|| self.to.clone())
        }
    }
}

/// Handler for POST /webhooks/telephony.
pub async fn telephony_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<TelephonyWebhook>,
) -> AppResult<Json<Value>> {
    let data = webhook.data;
    let payload = data.payload;

    let event = match data.event_type.as_str() {
        "call.answered" => CallEvent::CallAnswered {
            user_number: payload.user_number().ok_or_else(|| {
                AppError::BadRequest("call.answered event carried no phone number".to_string())
            })?,
        },
        "call.playback.ended" => CallEvent::PlaybackFinished {
            client_state: payload.client_state.as_deref().map(decode_client_state),
        },
        "call.recording.saved" => CallEvent::RecordingFinished {
            audio_url: payload
                .recording_urls
                .and_then(|urls| urls.mp3)
                .unwrap_or_default(),
        },
        "call.hangup" => CallEvent::CallHangup,
        other => {
            debug!(event_type = other, "ignoring telephony event");
            return Ok(Json(json!({ "status": "ignored" })));
        }
    };

    let call_control_id = payload.call_control_id.ok_or_else(|| {
        AppError::BadRequest(format!(
            "{} event carried no call_control_id",
            data.event_type
        ))
    })?;

    info!(call_control_id = %call_control_id, event = event.kind(), "telephony webhook");
    let action = state.orchestrator.dispatch(&call_control_id, event).await?;
    Ok(Json(json!({ "status": "ok", "action": action.kind() })))
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionWebhook {
    /// Job identifier; vendors disagree on the field name.
    #[serde(alias = "id", alias = "job_id")]
    pub transcript_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Handler for POST /webhooks/transcription.
///
/// The webhook is only a hint that the job may have resolved; the job status
/// is always re-read from the provider, never trusted from the payload.
pub async fn transcription_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<TranscriptionWebhook>,
) -> AppResult<Json<Value>> {
    info!(
        job_id = %webhook.transcript_id,
        status = webhook.status.as_deref().unwrap_or("unknown"),
        "transcription webhook"
    );
    let action = match state
        .orchestrator
        .on_transcription_callback(&webhook.transcript_id)
        .await
    {
        Ok(action) => action,
        Err(crate::errors::OrchestratorError::StaleCallback { detail, .. }) => {
            debug!(job_id = %webhook.transcript_id, %detail, "ignoring stale transcription webhook");
            return Ok(Json(json!({ "status": "ignored" })));
        }
        Err(err) => return Err(err.into()),
    };
    Ok(Json(json!({ "status": "ok", "action": action.kind() })))
}
