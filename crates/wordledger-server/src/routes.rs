// ABOUTME: Route definitions for the wordledger HTTP API.
// ABOUTME: Assembles all API routes into a single Axum Router with shared state and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;
use crate::web;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(web::index))
        .route("/api/v1/health", get(api::words::health))
        .route("/api/v1/texts", post(api::texts::ingest_text))
        .route("/api/v1/texts/batch", post(api::texts::ingest_batch))
        .route("/api/v1/words", get(api::words::list_words))
        .route(
            "/api/v1/words/{lemma}",
            get(api::words::get_word).patch(api::words::update_word_status),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
