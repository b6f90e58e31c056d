//! Shared application state for the web server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, Cookie, HeaderMapExt};
use clinomics_accounts::{Account, UserStore};
use clinomics_common::GeneSymbol;
use clinomics_ingestion::{BatchDriver, BatchProgress, BatchReport};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bootstrap::build_driver;
use crate::config::Config;
use crate::error::ApiError;
use crate::render::Templates;

/// Cookie carrying the session token for browser pages.
pub const SESSION_COOKIE: &str = "clinomics_session";

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub driver: Arc<BatchDriver>,
    pub accounts: Arc<UserStore>,
    pub templates: Templates,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<BatchProgress>,
    pub batch_timeout: Duration,
    pub require_login: bool,
    sessions: RwLock<HashMap<String, String>>,
}

impl AppState {
    pub fn new(
        driver: BatchDriver,
        accounts: UserStore,
        event_tx: broadcast::Sender<BatchProgress>,
        batch_timeout: Duration,
        require_login: bool,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            driver: Arc::new(driver),
            accounts: Arc::new(accounts),
            templates: Templates::new()?,
            event_tx,
            batch_timeout,
            require_login,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (event_tx, _) = broadcast::channel(256);
        let driver = build_driver(config, Some(event_tx.clone()))?;
        let accounts = UserStore::open(&config.accounts.users_file, config.accounts.free_daily_limit).await?;
        let state = Self::new(
            driver,
            accounts,
            event_tx,
            Duration::from_secs(config.batch.timeout_secs),
            config.accounts.require_login,
        )?;
        Ok(state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchProgress> {
        self.event_tx.subscribe()
    }

    /// Validate a raw gene list against the batch rules.
    pub fn prepare<I, S>(&self, tokens: I) -> Result<Vec<GeneSymbol>, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.driver.prepare(tokens)?)
    }

    /// Run validated genes under the submission deadline.
    pub async fn run(&self, genes: Vec<GeneSymbol>) -> Result<BatchReport, ApiError> {
        let cancel = CancellationToken::new();
        let deadline = cancel.clone();
        let timeout = self.batch_timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            deadline.cancel();
        });

        let outcome = self.driver.run_until(genes, cancel).await;
        timer.abort();
        Ok(outcome?)
    }

    /// Count one submission against the caller's quota.
    pub async fn charge(&self, caller: &Caller) -> Result<(), ApiError> {
        if let Some(username) = &caller.username {
            self.accounts.track_search(username).await?;
            debug!(%username, "Search recorded");
        }
        Ok(())
    }

    pub async fn create_session(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), username.to_string());
        info!(%username, "Session started");
        token
    }

    pub async fn end_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    pub async fn session_user(&self, token: &str) -> Option<String> {
        self.sessions.read().await.get(token).cloned()
    }
}

pub type SharedState = Arc<AppState>;

/// The signed-in user of a request, if any.
///
/// A bearer token takes precedence over the session cookie. Rejects the
/// request only when login is required and no valid session is presented.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub username: Option<String>,
    pub token: Option<String>,
}

impl Caller {
    pub async fn account(&self, state: &AppState) -> Option<Account> {
        let username = self.username.as_deref()?;
        state.accounts.account(username).await.ok()
    }

    pub fn require_user(&self) -> Result<&str, ApiError> {
        self.username
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Sign in required."))
    }
}

fn presented_token(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts.headers.typed_get::<Authorization<Bearer>>() {
        return Some(auth.token().to_string());
    }
    parts
        .headers
        .typed_get::<Cookie>()
        .and_then(|c| c.get(SESSION_COOKIE).map(str::to_string))
}

impl FromRequestParts<SharedState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts);
        let username = match &token {
            Some(token) => state.session_user(token).await,
            None => None,
        };

        if username.is_none() && state.require_login {
            return Err(ApiError::unauthorized("Sign in required."));
        }
        Ok(Caller { username, token })
    }
}
