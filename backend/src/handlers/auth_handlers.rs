use std::sync::Arc;
use axum::{
    Json,
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Header, EncodingKey};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiError,
    handlers::auth_dtos::{AuthAction, AuthRequest, AuthResponse, Claims, SessionStatusResponse},
    handlers::auth_middleware::AuthUser,
    models::user_models::{NewSession, NewUser, User},
    AppState,
};

pub const SESSION_DAYS: i64 = 30;
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

/// `POST /api/auth`: login or registration depending on `action`.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(auth_req) = payload.map_err(|e| {
        tracing::debug!("Rejected auth body: {}", e);
        ApiError::Validation("Invalid request body".to_string())
    })?;
    let email = auth_req.email.trim().to_lowercase();
    if email.is_empty() || auth_req.password.is_empty() {
        return Err(ApiError::MissingCredentials);
    }
    tracing::info!(action = ?auth_req.action, "Auth attempt");

    check_login_rate_limit(&state, &email)?;

    if !state.captcha.verify(&auth_req.captcha_token).await {
        tracing::info!("Captcha verification failed");
        return Err(ApiError::CaptchaFailed);
    }

    let user = match auth_req.action {
        AuthAction::Register => register_user(&state, &email, &auth_req.password)?,
        AuthAction::Login => verify_login(&state, &email, &auth_req.password)?,
    };

    let token = issue_session(&state, &user, user_agent(&headers))?;
    tracing::info!("User {} authenticated", user.id);
    Ok(Json(AuthResponse { token, user_id: user.id }))
}

fn check_login_rate_limit(state: &AppState, email: &str) -> Result<(), ApiError> {
    if state.login_limiter.check_key(&email.to_string()).is_err() {
        tracing::warn!("Rate limit exceeded for email: [redacted]");
        return Err(ApiError::RateLimited);
    }
    Ok(())
}

fn register_user(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if state.user_core.email_exists(email)? {
        return Err(ApiError::EmailTaken);
    }

    let password_hash = bcrypt::hash(password, state.config.bcrypt_cost).map_err(|e| {
        ApiError::Internal(format!("Password hashing failed: {}", e))
    })?;

    let user = state.user_core.create_user(NewUser {
        email: email.to_string(),
        password_hash: Some(password_hash),
        oauth_provider: None,
        oauth_id: None,
        full_name: None,
        avatar_url: None,
        created_at: Utc::now().timestamp() as i32,
    })?;
    tracing::info!("Registered user {}", user.id);
    Ok(user)
}

fn verify_login(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
    let user = state.user_core.find_by_email(email)?.ok_or(ApiError::InvalidCredentials)?;
    // Accounts created through oauth have no password to check against.
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ApiError::InvalidCredentials);
    };
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(user),
        _ => Err(ApiError::InvalidCredentials),
    }
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Signs a token for `user`, records the session and bumps `last_login`.
pub fn issue_session(state: &AppState, user: &User, user_agent: Option<String>) -> Result<String, ApiError> {
    let now = Utc::now();
    let expires_at = now + Duration::days(SESSION_DAYS);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: expires_at.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token generation failed: {}", e)))?;

    state.session_repository.save_session(NewSession {
        user_id: user.id,
        token: token.clone(),
        expires_at: expires_at.timestamp() as i32,
        user_agent,
        created_at: now.timestamp() as i32,
    })?;
    state.user_core.update_last_login(user.id, now.timestamp() as i32)?;

    Ok(token)
}

pub async fn session_status(
    auth_user: AuthUser,
) -> Json<SessionStatusResponse> {
    Json(SessionStatusResponse {
        authenticated: true,
        user_id: auth_user.user_id,
        email: auth_user.email,
    })
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.session_repository.delete_by_token(&auth_user.token)?;
    tracing::info!("User {} logged out", auth_user.user_id);
    Ok(Json(json!({"message": "Logged out successfully"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use crate::test_support::{test_state, TestDoubles};
    use crate::utils::captcha::MockCaptchaVerifier;

    fn accepting_captcha() -> MockCaptchaVerifier {
        let mut captcha = MockCaptchaVerifier::new();
        captcha.expect_verify().returning(|token| !token.is_empty());
        captcha
    }

    async fn post_auth(state: Arc<AppState>, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = crate::app(state)
            .oneshot(
                Request::post("/api/auth")
                    .header("content-type", "application/json")
                    .header("user-agent", "auth-tests")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    async fn get_with_token(state: Arc<AppState>, method: &str, uri: &str, token: &str) -> StatusCode {
        crate::app(state)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    fn credentials(action: &str, email: &str, password: &str) -> serde_json::Value {
        json!({"email": email, "password": password, "action": action, "captchaToken": "ok"})
    }

    #[tokio::test]
    async fn register_then_login_issues_working_tokens() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });

        let (status, body) = post_auth(state.clone(), credentials("register", " New@Example.com ", "hunter22")).await;
        assert_eq!(status, StatusCode::OK);
        let user_id = body["userId"].as_i64().unwrap();
        assert!(body["token"].as_str().is_some());

        let (status, body) = post_auth(state.clone(), credentials("login", "new@example.com", "hunter22")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"].as_i64().unwrap(), user_id);

        let token = body["token"].as_str().unwrap();
        assert_eq!(get_with_token(state.clone(), "GET", "/api/auth/session", token).await, StatusCode::OK);

        let stored = state.user_core.find_by_email("new@example.com").unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });
        let (status, _) = post_auth(state.clone(), credentials("register", "dup@example.com", "hunter22")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_auth(state, credentials("register", "dup@example.com", "other-pass")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already registered");
    }

    #[tokio::test]
    async fn unknown_action_is_treated_as_login() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });
        post_auth(state.clone(), credentials("register", "any@example.com", "hunter22")).await;

        let (status, body) = post_auth(state, credentials("signin", "any@example.com", "hunter22")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn malformed_body_gets_a_json_error() {
        let state = test_state(TestDoubles::default());
        let response = crate::app(state.clone())
            .oneshot(
                Request::post("/api/auth")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Invalid request body");

        let response = crate::app(state)
            .oneshot(Request::post("/api/auth").body(Body::from("email=a")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap()["error"].is_string());
    }

    #[tokio::test]
    async fn registration_losing_the_insert_race_reports_email_taken() {
        let state = test_state(TestDoubles::default());
        let new_user = || NewUser {
            email: "race@example.com".to_string(),
            password_hash: Some("hash".to_string()),
            oauth_provider: None,
            oauth_id: None,
            full_name: None,
            avatar_url: None,
            created_at: 0,
        };
        state.user_core.create_user(new_user()).unwrap();

        // The second writer passed the existence check before the first committed.
        let err = ApiError::from(state.user_core.create_user(new_user()).unwrap_err());
        assert!(matches!(err, ApiError::EmailTaken));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });
        post_auth(state.clone(), credentials("register", "pw@example.com", "hunter22")).await;

        let (status, body) = post_auth(state, credentials("login", "pw@example.com", "hunter23")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn unknown_email_is_unauthorized() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });
        let (status, _) = post_auth(state, credentials("login", "ghost@example.com", "hunter22")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_captcha() {
        let mut captcha = MockCaptchaVerifier::new();
        captcha.expect_verify().never();
        let state = test_state(TestDoubles { captcha, ..Default::default() });

        let (status, body) = post_auth(state, json!({"email": "a@example.com", "password": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password required");
    }

    #[tokio::test]
    async fn rejected_captcha_never_touches_the_database() {
        let mut captcha = MockCaptchaVerifier::new();
        captcha.expect_verify().times(1).returning(|_| false);
        let state = test_state(TestDoubles { captcha, ..Default::default() });

        let (status, body) = post_auth(state.clone(), credentials("register", "bot@example.com", "hunter22")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Captcha verification failed");
        assert!(state.user_core.find_by_email("bot@example.com").unwrap().is_none());
    }

    #[tokio::test]
    async fn registration_validates_email_and_password() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });

        let (status, body) = post_auth(state.clone(), credentials("register", "not-an-email", "hunter22")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email format");

        let (status, _) = post_auth(state, credentials("register", "short@example.com", "12345")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sixth_attempt_in_a_minute_is_rate_limited() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });
        for _ in 0..5 {
            let (status, _) = post_auth(state.clone(), credentials("login", "spam@example.com", "hunter22")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _) = post_auth(state, credentials("login", "spam@example.com", "hunter22")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let state = test_state(TestDoubles { captcha: accepting_captcha(), ..Default::default() });
        let (_, body) = post_auth(state.clone(), credentials("register", "out@example.com", "hunter22")).await;
        let token = body["token"].as_str().unwrap().to_string();

        assert_eq!(get_with_token(state.clone(), "POST", "/api/auth/logout", &token).await, StatusCode::OK);
        assert_eq!(get_with_token(state, "GET", "/api/auth/session", &token).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_requires_a_bearer_token() {
        let state = test_state(TestDoubles::default());
        let response = crate::app(state)
            .oneshot(Request::get("/api/auth/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let state = test_state(TestDoubles::default());
        assert_eq!(
            get_with_token(state, "GET", "/api/auth/session", "not.a.jwt").await,
            StatusCode::UNAUTHORIZED
        );
    }
}
