//! Configuration loading for ClinOmics.
//! Reads clinomics.toml from the current directory or the path in the
//! CLINOMICS_CONFIG env var. Every field has a default, so a missing file is
//! not an error.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clinomics_ingestion::{FallbackConfig, SourcesConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:3001".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout for every upstream call.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// Process-wide bound on concurrent upstream calls.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_http_timeout()            -> u64   { 10 }
fn default_max_concurrent_requests() -> usize { 6 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_gene_concurrency")]
    pub gene_concurrency: usize,
    #[serde(default = "default_max_genes")]
    pub max_genes: usize,
    /// Deadline for one submission; the batch is cancelled when it passes.
    #[serde(default = "default_batch_timeout")]
    pub timeout_secs: u64,
}

fn default_gene_concurrency() -> usize { 4 }
fn default_max_genes()        -> usize { 200 }
fn default_batch_timeout()    -> u64   { 120 }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            gene_concurrency: default_gene_concurrency(),
            max_genes: default_max_genes(),
            timeout_secs: default_batch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,
    #[serde(default)]
    pub require_login: bool,
    #[serde(default = "default_free_daily_limit")]
    pub free_daily_limit: u32,
}

fn default_users_file()       -> PathBuf { PathBuf::from("users.json") }
fn default_free_daily_limit() -> u32     { 5 }

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
            require_login: false,
            free_daily_limit: default_free_daily_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl Config {
    /// Config file location: `$CLINOMICS_CONFIG` or `./clinomics.toml`.
    pub fn path() -> PathBuf {
        std::env::var("CLINOMICS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("clinomics.toml"))
    }

    /// Load from [`Config::path`].
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from `path`; defaults when the file does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be at least 1");
        }
        if self.http.max_concurrent_requests == 0 {
            bail!("http.max_concurrent_requests must be at least 1");
        }
        if self.batch.gene_concurrency == 0 {
            bail!("batch.gene_concurrency must be at least 1");
        }
        if self.batch.max_genes == 0 {
            bail!("batch.max_genes must be at least 1");
        }
        if self.batch.timeout_secs == 0 {
            bail!("batch.timeout_secs must be at least 1");
        }
        Ok(())
    }
}

mod tests;
