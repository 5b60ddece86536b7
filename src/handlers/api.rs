use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// Aggregate health handler for GET / and GET /health.
///
/// Probes the store and every provider adapter. Responds 200 when all
/// probes pass, 503 otherwise, with per-service detail either way.
pub async fn health_report(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    let store = match state.store.health_check().await {
        Ok(()) => json!({ "status": "healthy", "backend": state.store.backend_type() }),
        Err(e) => json!({ "status": "unhealthy", "detail": e.to_string() }),
    };

    let telephony = state.telephony.health_check().await;
    let transcription = state.transcription.health_check().await;
    let llm = state.llm.health_check().await;
    let tts = state.tts.health_check().await;

    let healthy = store["status"] == "healthy"
        && telephony.is_healthy()
        && transcription.is_healthy()
        && llm.is_healthy()
        && tts.is_healthy();

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "services": {
            "store": store,
            "telephony": telephony.to_json(),
            "transcription": transcription.to_json(),
            "llm": llm.to_json(),
            "tts": tts.to_json(),
        }
    });

    (status, Json(body))
}
