use axum::{extract::State, response::Json};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::pipeline::VoiceStyle;
use crate::errors::AppResult;
use crate::state::AppState;

/// Handler for GET /voices - available TTS voices and style presets.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let voices = state.tts.list_voices().await?;
    Ok(Json(json!({
        "voices": voices,
        "styles": VoiceStyle::preset_names(),
    })))
}
