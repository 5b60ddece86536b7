use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::errors::AppError;
use crate::state::AppState;

/// Handler for GET /audio/{audio_id} - serves synthesized speech.
///
/// The telephony provider fetches playback audio from here; entries expire
/// out of the store on their own, so a miss after expiry is a plain 404.
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(audio_id): Path<String>,
) -> Result<Response, AppError> {
    let audio = state
        .store
        .get_audio(&audio_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("no audio with id {audio_id}")))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "audio/mpeg")],
        audio,
    )
        .into_response())
}
