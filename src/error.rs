use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated or session expired")]
    Unauthorized,

    #[error("not authorized: {0}")]
    Forbidden(String),

    #[error("resource not found")]
    NotFound,

    #[error("{message} (HTTP {status})")]
    Status { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidAuthResponse(String),

    #[error("no user is logged in")]
    NotAuthenticated,

    #[error("credential store: {0}")]
    Credentials(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound => Some(StatusCode::NOT_FOUND),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 404 and 422 are how the backend says "no such record" for lookups
    /// keyed on the caller's identity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::NOT_FOUND) | Some(StatusCode::UNPROCESSABLE_ENTITY)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

pub type ApiResult<T> = Result<T, ApiError>;
