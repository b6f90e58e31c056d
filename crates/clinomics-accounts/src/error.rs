use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists.")]
    UserExists,

    #[error("User not found.")]
    UserNotFound,

    #[error("Incorrect password.")]
    IncorrectPassword,

    #[error("Daily search limit reached (Free plan, {limit} per day).")]
    QuotaExceeded { limit: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
