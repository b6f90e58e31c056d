use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClinomicsError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected upstream response: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ClinomicsError {
    /// Short, user-facing description of a failed upstream call.
    pub fn upstream_reason(&self) -> String {
        match self {
            ClinomicsError::Http(e) if e.is_timeout() => "request timed out".to_string(),
            ClinomicsError::Http(e) if e.is_connect() => "connection failed".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClinomicsError>;
