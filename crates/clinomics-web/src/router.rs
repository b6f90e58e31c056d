//! Axum router: maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    account::{
        account_login_form, account_logout_form, account_page, account_register_form,
        api_login, api_logout, api_register, api_upgrade,
    },
    api::{api_analyze, api_batch, api_batch_upload, api_source, health},
    download::report_pdf,
    pages::{analyze_page, batch_page, index},
};
use crate::sse::sse_handler;

/// Upper bound on request bodies, uploads included.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",        get(index))
        .route("/analyze", post(analyze_page))
        .route("/batch",   post(batch_page))
        .route("/report",  get(report_pdf))
        .route("/account", get(account_page))
        .route("/account/login",    post(account_login_form))
        .route("/account/register", post(account_register_form))
        .route("/account/logout",   post(account_logout_form))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // API endpoints
        .route("/api/health",       get(health))
        .route("/api/analyze",      post(api_analyze))
        .route("/api/batch",        post(api_batch))
        .route("/api/batch/upload", post(api_batch_upload))
        .route("/api/genes/{gene}/{source}", get(api_source))
        .route("/api/account/register", post(api_register))
        .route("/api/account/login",    post(api_login))
        .route("/api/account/logout",   post(api_logout))
        .route("/api/account/upgrade",  post(api_upgrade))

        // Middleware
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
