// ABOUTME: Test helpers for driving the router in-process.
// ABOUTME: Builds state over an in-memory ledger and sends one-shot requests.

use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use http::Request;
use tower::ServiceExt;
use wordledger_store::Ledger;

use crate::app_state::{AppState, SharedState};
use crate::routes::create_router;

pub fn test_state() -> SharedState {
    Arc::new(AppState::new(Ledger::open_in_memory().unwrap()))
}

pub async fn send(
    state: &SharedState,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response {
    let app = create_router(Arc::clone(state));
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn json_body(resp: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
