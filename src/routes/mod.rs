//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/research",
            get(http::http_get_session)
                .post(http::http_post_research)
                .delete(http::http_delete_research),
        )
        .route("/api/v1/research/regenerate", post(http::http_post_regenerate))
        .route("/api/v1/research/extend", post(http::http_post_extend))
        .route("/api/v1/research/render", get(http::http_get_render))
        .route("/api/v1/research/clipboard", get(http::http_get_clipboard))
        .route("/api/v1/research/print", get(http::http_get_print))
        .route("/api/v1/render", post(http::http_post_render))
        .route("/api/v1/history", get(http::http_get_history))
        .route("/api/v1/history/:id", axum::routing::delete(http::http_delete_history))
        .route("/api/v1/history/:id/select", post(http::http_post_select_history))
        .route(
            "/api/v1/settings/credential",
            get(http::http_get_credential)
                .put(http::http_put_credential)
                .delete(http::http_delete_credential),
        )
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
