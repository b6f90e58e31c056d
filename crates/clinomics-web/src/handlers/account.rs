//! Account handlers: JSON endpoints with bearer tokens, and the HTML
//! sign-in page backed by the session cookie.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use clinomics_accounts::{Account, Plan};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::pages::html;
use crate::handlers::ApiJson;
use crate::state::{AppState, Caller, SharedState, SESSION_COOKIE};

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub plan: Plan,
}

#[derive(Deserialize)]
pub struct UpgradeRequest {
    #[serde(default = "default_upgrade_plan")]
    pub plan: Plan,
}

fn default_upgrade_plan() -> Plan { Plan::Pro }

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: Account,
}

fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

fn cleared_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

// ── JSON ─────────────────────────────────────────────────────────────────

/// POST /api/account/register
pub async fn api_register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<Credentials>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.accounts.register(&req.username, &req.password, req.plan).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /api/account/login
pub async fn api_login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let account = state.accounts.login(&req.username, &req.password).await?;
    let token = state.create_session(&account.username).await;
    Ok(Json(LoginResponse { token, account }))
}

/// POST /api/account/logout
pub async fn api_logout(State(state): State<SharedState>, caller: Caller) -> Json<Value> {
    if let Some(token) = &caller.token {
        state.end_session(token).await;
    }
    Json(json!({ "status": "signed_out" }))
}

/// POST /api/account/upgrade
pub async fn api_upgrade(
    State(state): State<SharedState>,
    caller: Caller,
    ApiJson(req): ApiJson<UpgradeRequest>,
) -> Result<Json<Account>, ApiError> {
    let username = caller.require_user()?;
    let account = state.accounts.upgrade_plan(username, req.plan).await?;
    Ok(Json(account))
}

// ── HTML ─────────────────────────────────────────────────────────────────

async fn account_view(state: &AppState, caller: Option<&Caller>, error: Option<&str>, status: StatusCode) -> Response {
    let account = match caller {
        Some(caller) => caller.account(state).await,
        None => None,
    };
    html(status, state.templates.account(account.as_ref(), None, error))
}

/// GET /account
///
/// Always reachable, so a stale cookie falls back to the sign-in form.
pub async fn account_page(State(state): State<SharedState>, caller: Result<Caller, ApiError>) -> Response {
    account_view(&state, caller.ok().as_ref(), None, StatusCode::OK).await
}

fn signed_in(token: &str) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(token))],
        Redirect::to("/"),
    )
        .into_response()
}

/// POST /account/login
pub async fn account_login_form(State(state): State<SharedState>, Form(form): Form<Credentials>) -> Response {
    match state.accounts.login(&form.username, &form.password).await {
        Ok(account) => {
            let token = state.create_session(&account.username).await;
            signed_in(&token)
        }
        Err(e) => {
            let err = ApiError::from(e);
            account_view(&state, None, Some(&err.user_message()), err.status_code()).await
        }
    }
}

/// POST /account/register
pub async fn account_register_form(State(state): State<SharedState>, Form(form): Form<Credentials>) -> Response {
    match state.accounts.register(&form.username, &form.password, form.plan).await {
        Ok(account) => {
            let token = state.create_session(&account.username).await;
            signed_in(&token)
        }
        Err(e) => {
            let err = ApiError::from(e);
            account_view(&state, None, Some(&err.user_message()), err.status_code()).await
        }
    }
}

/// POST /account/logout
pub async fn account_logout_form(State(state): State<SharedState>, caller: Result<Caller, ApiError>) -> Response {
    if let Some(token) = caller.ok().and_then(|c| c.token) {
        state.end_session(&token).await;
    }
    (
        [(header::SET_COOKIE, cleared_cookie())],
        Redirect::to("/account"),
    )
        .into_response()
}
