pub mod docs;
pub mod health;
pub mod messages;
pub mod switch;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use hub_engine::{MessageStore, ResultCache};

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router<S, C>(state: AppState<S, C>) -> Router
where
    S: MessageStore + 'static,
    C: ResultCache + 'static,
{
    Router::new()
        .merge(health::router())
        .merge(docs::router())
        .merge(switch::router())
        .merge(messages::router())
        .with_state(state)
}

/// Wrap `router` with the server-wide layers: a per-request timeout that
/// answers 408, request tracing and permissive CORS.
pub fn with_http_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
