//! API error type and its HTTP mapping.
//!
//! Every JSON endpoint returns `{ "error": "<message>" }` with the status
//! below on failure.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinomics_accounts::AccountError;
use clinomics_common::ClinomicsError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid gene list, malformed upload, bad form (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown session (401)
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Daily quota used up (429)
    #[error("{0}")]
    QuotaExceeded(String),

    /// Batch deadline passed; nothing is returned (504)
    #[error("{0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)    => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_)  => StatusCode::UNAUTHORIZED,
            Self::NotFound(_)      => StatusCode::NOT_FOUND,
            Self::Conflict(_)      => StatusCode::CONFLICT,
            Self::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_)       => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_)      => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ClinomicsError> for ApiError {
    fn from(e: ClinomicsError) -> Self {
        match e {
            ClinomicsError::InvalidInput(msg) => Self::BadRequest(msg),
            ClinomicsError::Cancelled => {
                Self::Timeout("The analysis took too long and was cancelled.".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::UserExists => Self::Conflict(e.to_string()),
            AccountError::UserNotFound | AccountError::IncorrectPassword => Self::Unauthorized(e.to_string()),
            AccountError::QuotaExceeded { .. } => Self::QuotaExceeded(e.to_string()),
            AccountError::InvalidInput(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(e: minijinja::Error) -> Self {
        Self::Internal(format!("template: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "Request failed");
        }
        let body = Json(json!({ "error": self.user_message() }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let e: ApiError = ClinomicsError::InvalidInput("Gene name required.".into()).into();
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.user_message(), "Gene name required.");

        let e: ApiError = ClinomicsError::Cancelled.into();
        assert_eq!(e.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let e: ApiError = AccountError::QuotaExceeded { limit: 5 }.into();
        assert_eq!(e.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let e: ApiError = AccountError::IncorrectPassword.into();
        assert_eq!(e.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_detail_is_not_shown() {
        let e = ApiError::internal("disk on fire");
        assert!(!e.user_message().contains("disk"));
    }
}
