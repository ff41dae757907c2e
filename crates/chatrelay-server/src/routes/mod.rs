//! HTTP route handlers — the chat and file relays plus a health check.

pub mod chat;
pub mod files;
pub mod health;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use chatrelay_chat::ErrorBody;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(chat::routes())
        .merge(files::routes(max_upload_bytes))
}

/// JSON `{error}` body with the given status.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
