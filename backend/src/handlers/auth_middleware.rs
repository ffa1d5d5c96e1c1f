use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use std::sync::Arc;
use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};

use crate::AppState;
use crate::error::ApiError;
use crate::handlers::auth_dtos::Claims;

/// Caller of a protected route: a valid bearer token whose session row is
/// still present and unexpired.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub token: String,
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::Unauthorized("Invalid token".to_string())
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Extract the token from the Authorization header
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("No authorization token provided".to_string()))?;

        let claims = decode_claims(token, &state.config.jwt_secret)?;

        let now = Utc::now().timestamp() as i32;
        let session = state
            .session_repository
            .find_active(token, now)?
            .ok_or_else(|| ApiError::Unauthorized("Session expired or revoked".to_string()))?;

        if session.user_id != claims.sub {
            tracing::warn!("Session {} does not belong to token subject {}", session.id, claims.sub);
            return Err(ApiError::Unauthorized("Invalid token".to_string()));
        }

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
            token: token.to_string(),
        })
    }
}
