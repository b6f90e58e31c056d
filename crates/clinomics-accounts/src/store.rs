//! JSON-backed user store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::AccountError;

pub const DEFAULT_FREE_DAILY_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl std::str::FromStr for Plan {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro"  => Ok(Plan::Pro),
            other  => Err(AccountError::InvalidInput(format!("Unknown plan: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    password_hash: String,
    plan: Plan,
    #[serde(default)]
    searches_today: u32,
    #[serde(default)]
    search_day: Option<NaiveDate>,
}

impl UserRecord {
    /// Searches counted for `today`; a counter from an earlier day is zero.
    fn searches_on(&self, today: NaiveDate) -> u32 {
        if self.search_day == Some(today) {
            self.searches_today
        } else {
            0
        }
    }
}

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub username: String,
    pub plan: Plan,
    pub searches_today: u32,
}

pub struct UserStore {
    path: Option<PathBuf>,
    free_daily_limit: u32,
    users: Mutex<BTreeMap<String, UserRecord>>,
}

impl UserStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>, free_daily_limit: u32) -> Result<Self, AccountError> {
        let path = path.into();
        let users = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), users = users.len(), "User store opened");
        Ok(Self { path: Some(path), free_daily_limit, users: Mutex::new(users) })
    }

    /// A store that is never written to disk.
    pub fn in_memory(free_daily_limit: u32) -> Self {
        Self { path: None, free_daily_limit, users: Mutex::new(BTreeMap::new()) }
    }

    pub fn free_daily_limit(&self) -> u32 {
        self.free_daily_limit
    }

    pub async fn register(&self, username: &str, password: &str, plan: Plan) -> Result<Account, AccountError> {
        let username = normalize_username(username)?;
        if password.is_empty() {
            return Err(AccountError::InvalidInput("Password required.".to_string()));
        }
        if self.users.lock().await.contains_key(&username) {
            return Err(AccountError::UserExists);
        }

        let password_hash = hash_password(password.to_string()).await?;
        let mut users = self.users.lock().await;
        if users.contains_key(&username) {
            return Err(AccountError::UserExists);
        }
        let record = UserRecord { password_hash, plan, searches_today: 0, search_day: None };
        self.commit(&mut users, &username, record).await?;
        info!(%username, ?plan, "User registered");

        Ok(Account { username, plan, searches_today: 0 })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Account, AccountError> {
        let username = normalize_username(username)?;
        let stored = {
            let users = self.users.lock().await;
            users.get(&username).ok_or(AccountError::UserNotFound)?.password_hash.clone()
        };
        if !verify_password(password.to_string(), stored).await? {
            debug!(%username, "Password mismatch");
            return Err(AccountError::IncorrectPassword);
        }
        self.account(&username).await
    }

    pub async fn account(&self, username: &str) -> Result<Account, AccountError> {
        let users = self.users.lock().await;
        let record = users.get(username).ok_or(AccountError::UserNotFound)?;
        Ok(account(username, record, today()))
    }

    pub async fn upgrade_plan(&self, username: &str, plan: Plan) -> Result<Account, AccountError> {
        let mut users = self.users.lock().await;
        let mut record = users.get(username).ok_or(AccountError::UserNotFound)?.clone();
        record.plan = plan;
        let updated = account(username, &record, today());
        self.commit(&mut users, username, record).await?;
        info!(%username, ?plan, "Plan changed");
        Ok(updated)
    }

    /// True when the user may run another search today.
    pub async fn check_quota(&self, username: &str) -> Result<bool, AccountError> {
        self.check_quota_on(username, today()).await
    }

    /// Count one search against today's quota.
    pub async fn record_search(&self, username: &str) -> Result<(), AccountError> {
        self.record_search_on(username, today()).await
    }

    /// Check and record in one step; `QuotaExceeded` when nothing was recorded.
    pub async fn track_search(&self, username: &str) -> Result<(), AccountError> {
        self.track_search_on(username, today()).await
    }

    async fn check_quota_on(&self, username: &str, day: NaiveDate) -> Result<bool, AccountError> {
        let users = self.users.lock().await;
        let record = users.get(username).ok_or(AccountError::UserNotFound)?;
        Ok(self.within_quota(record, day))
    }

    async fn record_search_on(&self, username: &str, day: NaiveDate) -> Result<(), AccountError> {
        let mut users = self.users.lock().await;
        let mut record = users.get(username).ok_or(AccountError::UserNotFound)?.clone();
        bump(&mut record, day);
        self.commit(&mut users, username, record).await
    }

    async fn track_search_on(&self, username: &str, day: NaiveDate) -> Result<(), AccountError> {
        let mut users = self.users.lock().await;
        let mut record = users.get(username).ok_or(AccountError::UserNotFound)?.clone();
        if !self.within_quota(&record, day) {
            return Err(AccountError::QuotaExceeded { limit: self.free_daily_limit });
        }
        bump(&mut record, day);
        self.commit(&mut users, username, record).await
    }

    fn within_quota(&self, record: &UserRecord, day: NaiveDate) -> bool {
        match record.plan {
            Plan::Pro => true,
            Plan::Free => record.searches_on(day) < self.free_daily_limit,
        }
    }

    /// Store `record` and persist; the previous record is restored when the
    /// write fails.
    async fn commit(
        &self,
        users: &mut BTreeMap<String, UserRecord>,
        username: &str,
        record: UserRecord,
    ) -> Result<(), AccountError> {
        let previous = users.insert(username.to_string(), record);
        if let Err(e) = self.persist(users).await {
            warn!(%username, error = %e, "User store write failed, change discarded");
            match previous {
                Some(previous) => users.insert(username.to_string(), previous),
                None => users.remove(username),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Write through a sibling temp file and rename over the original.
    async fn persist(&self, users: &BTreeMap<String, UserRecord>) -> Result<(), AccountError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(users)?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn bump(record: &mut UserRecord, day: NaiveDate) {
    record.searches_today = record.searches_on(day) + 1;
    record.search_day = Some(day);
}

fn account(username: &str, record: &UserRecord, day: NaiveDate) -> Account {
    Account {
        username: username.to_string(),
        plan: record.plan,
        searches_today: record.searches_on(day),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn normalize_username(raw: &str) -> Result<String, AccountError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AccountError::InvalidInput("Username required.".to_string()));
    }
    Ok(username.to_string())
}

/// Argon2 is CPU-bound, so hashing runs on the blocking pool.
async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccountError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| AccountError::Hash(e.to_string()))?
}

async fn verify_password(password: String, phc: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || -> Result<bool, AccountError> {
        let parsed = PasswordHash::new(&phc).map_err(|e| AccountError::Hash(e.to_string()))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| AccountError::Hash(e.to_string()))?
}
