//! Health check endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router<S, C>() -> Router<AppState<S, C>>
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({}))
}
