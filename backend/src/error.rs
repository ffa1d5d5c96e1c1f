use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures coming out of the diesel repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to get DB connection: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("unique constraint violated")]
    Duplicate,
    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),
}

impl RepositoryError {
    /// Turns a unique constraint failure into `Duplicate`, keeps the rest.
    pub fn from_insert(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _) => {
                RepositoryError::Duplicate
            }
            other => RepositoryError::Query(other),
        }
    }
}

/// Every error a handler can return. The display string is what ends up in
/// the `{"error": ...}` body, so keep it user facing.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Email and password required")]
    MissingCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("Captcha verification failed")]
    CaptchaFailed,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Too many login attempts, try again later")]
    RateLimited,
    #[error("{0}")]
    Unauthorized(String),
    #[error("Unknown provider")]
    UnknownProvider,
    #[error("Invalid OAuth callback")]
    InvalidOAuthCallback,
    #[error("OAuth authentication failed")]
    OAuthFailed,
    #[error("Database error")]
    Repository(RepositoryError),
    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            // The only unique column a handler can trip is `users.email`.
            RepositoryError::Duplicate => ApiError::EmailTaken,
            other => ApiError::Repository(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials
            | ApiError::Validation(_)
            | ApiError::CaptchaFailed
            | ApiError::EmailTaken
            | ApiError::UnknownProvider
            | ApiError::InvalidOAuthCallback
            | ApiError::OAuthFailed => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Repository(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Repository(e) => tracing::error!("Repository failure: {}", e),
            ApiError::Internal(msg) => tracing::error!("Internal failure: {}", msg),
            other => tracing::debug!(status = status.as_u16(), "Request rejected: {}", other),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
