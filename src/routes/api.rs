use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, audio, calls, voices};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_report))
        .route("/health", get(api::health_report))
        .route("/calls", post(calls::place_call))
        .route("/calls/:call_control_id", get(calls::get_call))
        .route("/voices", get(voices::list_voices))
        .route("/audio/:audio_id", get(audio::get_audio))
        .layer(TraceLayer::new_for_http())
}
