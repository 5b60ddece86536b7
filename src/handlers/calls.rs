use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceCallRequest {
    /// E.164 destination number.
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceCallResponse {
    pub call_control_id: String,
}

/// Handler for POST /calls - dials out to a user.
///
/// The call state itself is created when the telephony provider reports the
/// call answered, so this only returns the provider's call id.
pub async fn place_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlaceCallRequest>,
) -> AppResult<Json<PlaceCallResponse>> {
    if request.to.trim().is_empty() {
        return Err(AppError::BadRequest(
            "destination number cannot be empty".to_string(),
        ));
    }

    let call_control_id = state.orchestrator.place_call(request.to.trim()).await?;
    Ok(Json(PlaceCallResponse { call_control_id }))
}

/// Handler for GET /calls/{call_control_id} - current state of a call.
pub async fn get_call(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(call_control_id): axum::extract::Path<String>,
) -> AppResult<Json<Value>> {
    let call = state
        .store
        .get_call(&call_control_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("no call with id {call_control_id}")))?;

    Ok(Json(json!({
        "call_control_id": call.call_control_id,
        "user_number": call.user_number,
        "stage": call.stage,
        "chat_turns": call.chat_turns,
        "created_at": call.created_at,
        "last_updated": call.last_updated,
        "end_time": call.end_time,
    })))
}
