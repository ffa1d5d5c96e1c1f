use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use serde_json::json;
use time::OffsetDateTime;
use tower_sessions::{session_store::SessionStore, session::{Id, Record}};
use uuid::Uuid;

use crate::{
    error::ApiError,
    handlers::auth_dtos::{OAuthCallbackQuery, OAuthStartQuery},
    handlers::auth_handlers::{issue_session, user_agent},
    models::user_models::{NewUser, User},
    utils::oauth_providers::{OAuthIdentity, OAuthProvider},
    AppState,
};

const STATE_TTL_MINUTES: i64 = 10;
const MAX_NONCE_LENGTH: usize = 64;

fn valid_nonce(nonce: &str) -> bool {
    !nonce.is_empty()
        && nonce.len() <= MAX_NONCE_LENGTH
        && nonce.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `GET /api/auth/oauth/{provider}`: stores csrf/pkce/nonce for the popup and
/// sends the browser to the provider's consent screen.
pub async fn oauth_redirect(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<OAuthStartQuery>,
) -> Result<Response, ApiError> {
    let provider = OAuthProvider::from_slug(&provider).ok_or(ApiError::UnknownProvider)?;
    let client = state.oauth_clients.get(provider).ok_or(ApiError::UnknownProvider)?;

    let nonce = match params.nonce {
        Some(nonce) if valid_nonce(&nonce) => Some(nonce),
        Some(_) => return Err(ApiError::Validation("Invalid nonce".to_string())),
        None => None,
    };

    let csrf_token = CsrfToken::new_random();
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut record = Record {
        id: Id(Uuid::new_v4().as_u128() as i128),
        data: Default::default(),
        expiry_date: OffsetDateTime::now_utc() + time::Duration::minutes(STATE_TTL_MINUTES),
    };
    record.data.insert("provider".to_string(), json!(provider.slug()));
    record.data.insert("csrf_token".to_string(), json!(csrf_token.secret()));
    record.data.insert("pkce_verifier".to_string(), json!(pkce_verifier.secret()));
    if let Some(nonce) = &nonce {
        record.data.insert("nonce".to_string(), json!(nonce));
    }

    state.oauth_store.create(&mut record).await.map_err(|e| {
        ApiError::Internal(format!("Failed to store oauth state: {}", e))
    })?;

    let state_token = format!("{}:{}", record.id.0, csrf_token.secret());
    let mut auth_builder = client.authorize_url(|| CsrfToken::new(state_token.clone()));
    for scope in provider.scopes() {
        auth_builder = auth_builder.add_scope(Scope::new(scope.to_string()));
    }
    let (auth_url, _) = auth_builder.set_pkce_challenge(pkce_challenge).url();

    tracing::info!("Redirecting to {} consent screen", provider.slug());
    Ok((StatusCode::FOUND, [(header::LOCATION, auth_url.to_string())]).into_response())
}

/// `GET /api/auth/callback`: finishes the login and hands the token back to
/// the window that opened the popup.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Html<String>, ApiError> {
    let (code, state_param) = match (query.code, query.state) {
        (Some(code), Some(state_param)) if !code.is_empty() && !state_param.is_empty() => (code, state_param),
        _ => return Err(ApiError::InvalidOAuthCallback),
    };

    let (record_id, state_csrf) = state_param.split_once(':').ok_or(ApiError::InvalidOAuthCallback)?;
    let record_id = Id(record_id.parse::<i128>().map_err(|_| ApiError::InvalidOAuthCallback)?);

    let record = state.oauth_store.load(&record_id).await
        .map_err(|e| ApiError::Internal(format!("Session store error: {}", e)))?
        .ok_or_else(|| {
            tracing::warn!("OAuth state record missing or expired");
            ApiError::InvalidOAuthCallback
        })?;
    // State is single use whatever happens next.
    if let Err(e) = state.oauth_store.delete(&record_id).await {
        tracing::error!("Failed to delete oauth state record: {}", e);
    }

    let stored = |key: &str| record.data.get(key).and_then(|v| v.as_str()).map(String::from);
    if stored("csrf_token").as_deref() != Some(state_csrf) {
        tracing::warn!("CSRF token mismatch");
        return Err(ApiError::InvalidOAuthCallback);
    }
    let provider = stored("provider")
        .and_then(|slug| OAuthProvider::from_slug(&slug))
        .ok_or(ApiError::InvalidOAuthCallback)?;
    let pkce_verifier = stored("pkce_verifier").ok_or(ApiError::InvalidOAuthCallback)?;
    let nonce = stored("nonce");

    let identity = state
        .identity_exchange
        .exchange(provider, code, pkce_verifier)
        .await
        .map_err(|e| {
            tracing::warn!("{} login failed: {}", provider.slug(), e);
            ApiError::OAuthFailed
        })?;

    let user = find_or_create_oauth_user(&state, provider, &identity)?;
    let token = issue_session(&state, &user, user_agent(&headers))?;
    tracing::info!("User {} signed in with {}", user.id, provider.slug());

    Ok(Html(callback_page(&state.config.frontend_origin(), &token, user.id, nonce.as_deref())))
}

fn find_or_create_oauth_user(state: &AppState, provider: OAuthProvider, identity: &OAuthIdentity) -> Result<User, ApiError> {
    if let Some(user) = state.user_core.find_by_oauth(provider.slug(), &identity.subject)? {
        return Ok(user);
    }

    let email = identity.email.trim().to_lowercase();
    if let Some(user) = state.user_core.find_by_email(&email)? {
        // An unconfirmed address proves nothing about who owns the account.
        if !identity.email_verified {
            tracing::warn!("Refusing to link unverified {} email to user {}", provider.slug(), user.id);
            return Err(ApiError::EmailTaken);
        }
        tracing::info!("Linking {} identity to existing user {}", provider.slug(), user.id);
        state.user_core.link_oauth_identity(user.id, provider.slug(), &identity.subject)?;
        return Ok(user);
    }

    let user = state.user_core.create_user(NewUser {
        email,
        password_hash: None,
        oauth_provider: Some(provider.slug().to_string()),
        oauth_id: Some(identity.subject.clone()),
        full_name: identity.name.clone(),
        avatar_url: identity.avatar.clone(),
        created_at: chrono::Utc::now().timestamp() as i32,
    })?;
    Ok(user)
}

/// Page rendered inside the popup: posts the token to the opener, restricted
/// to the frontend origin, then closes itself.
fn callback_page(frontend_origin: &str, token: &str, user_id: i32, nonce: Option<&str>) -> String {
    let payload = json!({ "token": token, "userId": user_id, "nonce": nonce }).to_string();
    let origin = json!(frontend_origin).to_string();
    let script = format!(
        "if (window.opener) {{ window.opener.postMessage({}, {}); }} window.close();",
        payload, origin
    )
    .replace("</", "<\\/");
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>YAPPERTAR AI</title></head><body><script>{}</script></body></html>",
        script
    )
}
