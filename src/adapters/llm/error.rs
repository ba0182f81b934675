use thiserror::Error;

use crate::domain::errors::DomainError;

/// Errors returned by the Messages API client.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API server error: {0}")]
    ServerError(String),

    #[error("API server overloaded")]
    Overloaded,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Unexpected response: {0}")]
    Unknown(String),
}

impl LlmError {
    /// Whether retrying the same request can succeed.
    ///
    /// Connect failures and timeouts count as transient; a response that
    /// failed to decode does not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded | Self::ServerError(_) | Self::Overloaded => true,
            Self::NetworkError(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }

    /// Map a non-success status and its body to an error.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 | 404 | 413 | 422 => Self::InvalidRequest(body),
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimitExceeded,
            529 => Self::Overloaded,
            code if (500..600).contains(&code) => Self::ServerError(body),
            _ => Self::Unknown(format!("HTTP {status}: {body}")),
        }
    }
}

impl From<LlmError> for DomainError {
    fn from(err: LlmError) -> Self {
        DomainError::ExternalService(err.to_string())
    }
}
