use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;

use crate::handlers::webhooks;
use crate::state::AppState;
use std::sync::Arc;

pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks/telephony", post(webhooks::telephony_webhook))
        .route(
            "/webhooks/transcription",
            post(webhooks::transcription_webhook),
        )
        .layer(TraceLayer::new_for_http())
}
