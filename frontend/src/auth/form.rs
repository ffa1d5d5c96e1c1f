use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::api::{Api, ErrorResponse, TransportError};
use crate::utils::storage::{KeyValueStore, StorageHandle, AUTH_TOKEN_KEY, USER_EMAIL_KEY};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MOCK_DELAY_MS: u32 = 1_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn switched(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormError {
    #[error("email and password are required")]
    EmptyFields,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password is too short")]
    PasswordTooShort,
    #[error("captcha token is missing")]
    CaptchaMissing,
    #[error("server rejected the request: {0:?}")]
    Server(Option<String>),
    #[error("network failure: {0}")]
    Network(String),
}

impl FormError {
    /// Translation key for the alert; server errors carry their own text.
    pub fn message_key(&self) -> &'static str {
        match self {
            FormError::EmptyFields => "error_empty_fields",
            FormError::PasswordMismatch => "error_password_mismatch",
            FormError::PasswordTooShort => "error_password_too_short",
            FormError::CaptchaMissing => "error_captcha_missing",
            FormError::Server(_) => "error_server",
            FormError::Network(_) => "error_network",
        }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            FormError::Server(Some(message)) => Some(message),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
    pub action: AuthMode,
    pub captcha_token: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccess {
    pub token: String,
    pub user_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthReply {
    Accepted(AuthSuccess),
    Rejected(Option<String>),
}

#[async_trait(?Send)]
pub trait AuthTransport {
    async fn post_auth(&self, request: &AuthRequest) -> Result<AuthReply, TransportError>;
}

#[async_trait(?Send)]
pub trait Delay {
    async fn wait(&self, ms: u32);
}

/// `POST /api/auth` through the shared request wrapper.
pub struct HttpAuthTransport {
    pub storage: StorageHandle,
}

#[async_trait(?Send)]
impl AuthTransport for HttpAuthTransport {
    async fn post_auth(&self, request: &AuthRequest) -> Result<AuthReply, TransportError> {
        let response = Api::post("/api/auth", self.storage.clone())
            .json(request)?
            .send()
            .await?;
        if response.ok() {
            return match response.json::<AuthSuccess>().await {
                Ok(success) => Ok(AuthReply::Accepted(success)),
                Err(e) => {
                    log::warn!("Malformed auth response: {}", e);
                    Ok(AuthReply::Rejected(None))
                }
            };
        }
        log::info!("Auth request failed with status {}", response.status());
        let message = response.json::<ErrorResponse>().await.ok().map(|body| body.error);
        Ok(AuthReply::Rejected(message))
    }
}

pub struct TimerDelay;

#[async_trait(?Send)]
impl Delay for TimerDelay {
    async fn wait(&self, ms: u32) {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

pub fn validate_networked(
    mode: AuthMode,
    credentials: &Credentials,
    captcha_token: Option<&str>,
) -> Result<(), FormError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(FormError::EmptyFields);
    }
    if mode == AuthMode::Register && credentials.password != credentials.confirm_password {
        return Err(FormError::PasswordMismatch);
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(FormError::PasswordTooShort);
    }
    match captcha_token {
        Some(token) if !token.is_empty() => Ok(()),
        _ => Err(FormError::CaptchaMissing),
    }
}

/// Validates, sends exactly one request and stores the returned token.
pub async fn submit_networked(
    transport: &dyn AuthTransport,
    storage: &dyn KeyValueStore,
    mode: AuthMode,
    credentials: &Credentials,
    captcha_token: Option<String>,
) -> Result<AuthSuccess, FormError> {
    validate_networked(mode, credentials, captcha_token.as_deref())?;

    let request = AuthRequest {
        email: credentials.email.trim().to_string(),
        password: credentials.password.clone(),
        action: mode,
        captcha_token: captcha_token.unwrap_or_default(),
    };
    match transport.post_auth(&request).await {
        Ok(AuthReply::Accepted(success)) => {
            if let Err(e) = storage.set(AUTH_TOKEN_KEY, &success.token) {
                log::warn!("Could not persist auth token: {}", e);
            }
            log::info!("Authenticated as user {}", success.user_id);
            Ok(success)
        }
        Ok(AuthReply::Rejected(message)) => Err(FormError::Server(message)),
        Err(e) => {
            log::error!("Auth request failed: {}", e);
            Err(FormError::Network(e.to_string()))
        }
    }
}

/// Offline login: any non-empty pair succeeds after a fixed delay and the
/// email is remembered as the signed-in user.
pub async fn submit_mock(
    delay: &dyn Delay,
    storage: &dyn KeyValueStore,
    credentials: &Credentials,
) -> Result<(), FormError> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(FormError::EmptyFields);
    }
    delay.wait(MOCK_DELAY_MS).await;
    if let Err(e) = storage.set(USER_EMAIL_KEY, &credentials.email) {
        log::warn!("Could not persist user email: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use futures::executor::block_on;
    use crate::utils::storage::MemoryStorage;

    #[derive(Default)]
    struct RecordingDelay {
        calls: RefCell<Vec<u32>>,
    }

    #[async_trait(?Send)]
    impl Delay for RecordingDelay {
        async fn wait(&self, ms: u32) {
            self.calls.borrow_mut().push(ms);
        }
    }

    struct FakeTransport {
        reply: Result<AuthReply, TransportError>,
        calls: Cell<usize>,
        last: RefCell<Option<AuthRequest>>,
    }

    impl FakeTransport {
        fn new(reply: Result<AuthReply, TransportError>) -> Self {
            Self { reply, calls: Cell::new(0), last: RefCell::new(None) }
        }
    }

    #[async_trait(?Send)]
    impl AuthTransport for FakeTransport {
        async fn post_auth(&self, request: &AuthRequest) -> Result<AuthReply, TransportError> {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = Some(request.clone());
            self.reply.clone()
        }
    }

    fn creds(email: &str, password: &str, confirm: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn accepted() -> Result<AuthReply, TransportError> {
        Ok(AuthReply::Accepted(AuthSuccess { token: "jwt".to_string(), user_id: 3 }))
    }

    #[test]
    fn mock_login_waits_then_stores_email() {
        let delay = RecordingDelay::default();
        let store = MemoryStorage::new();
        block_on(submit_mock(&delay, &store, &creds("a@b.co", "x", ""))).unwrap();
        assert_eq!(*delay.calls.borrow(), vec![MOCK_DELAY_MS]);
        assert_eq!(store.get(USER_EMAIL_KEY).as_deref(), Some("a@b.co"));
    }

    #[test]
    fn mock_login_with_empty_field_never_waits() {
        let delay = RecordingDelay::default();
        let store = MemoryStorage::new();
        for c in [creds("", "secret", ""), creds("a@b.co", "", "")] {
            assert_eq!(block_on(submit_mock(&delay, &store, &c)), Err(FormError::EmptyFields));
        }
        assert!(delay.calls.borrow().is_empty());
        assert_eq!(store.get(USER_EMAIL_KEY), None);
    }

    #[test]
    fn register_with_mismatched_passwords_sends_nothing() {
        let transport = FakeTransport::new(accepted());
        let store = MemoryStorage::new();
        let result = block_on(submit_networked(
            &transport,
            &store,
            AuthMode::Register,
            &creds("a@b.co", "secret1", "secret2"),
            Some("captcha".to_string()),
        ));
        assert_eq!(result, Err(FormError::PasswordMismatch));
        assert_eq!(transport.calls.get(), 0);
    }

    #[test]
    fn missing_captcha_blocks_even_valid_fields() {
        let transport = FakeTransport::new(accepted());
        let store = MemoryStorage::new();
        for token in [None, Some(String::new())] {
            let result = block_on(submit_networked(
                &transport,
                &store,
                AuthMode::Login,
                &creds("a@b.co", "secret1", ""),
                token,
            ));
            assert_eq!(result, Err(FormError::CaptchaMissing));
        }
        assert_eq!(transport.calls.get(), 0);
    }

    #[test]
    fn short_password_is_rejected_locally() {
        assert_eq!(
            validate_networked(AuthMode::Login, &creds("a@b.co", "12345", ""), Some("t")),
            Err(FormError::PasswordTooShort)
        );
    }

    #[test]
    fn accepted_login_stores_token_and_sends_action() {
        let transport = FakeTransport::new(accepted());
        let store = MemoryStorage::new();
        let success = block_on(submit_networked(
            &transport,
            &store,
            AuthMode::Register,
            &creds(" a@b.co ", "secret1", "secret1"),
            Some("captcha".to_string()),
        ))
        .unwrap();

        assert_eq!(success.user_id, 3);
        assert_eq!(store.get(AUTH_TOKEN_KEY).as_deref(), Some("jwt"));
        assert_eq!(transport.calls.get(), 1);
        let sent = transport.last.borrow().clone().unwrap();
        assert_eq!(sent.email, "a@b.co");
        assert_eq!(sent.action, AuthMode::Register);

        let body = serde_json::to_value(&sent).unwrap();
        assert_eq!(body["action"], "register");
        assert_eq!(body["captchaToken"], "captcha");
    }

    #[test]
    fn server_error_text_is_surfaced() {
        let transport = FakeTransport::new(Ok(AuthReply::Rejected(Some("Invalid credentials".to_string()))));
        let store = MemoryStorage::new();
        let err = block_on(submit_networked(
            &transport,
            &store,
            AuthMode::Login,
            &creds("a@b.co", "secret1", ""),
            Some("captcha".to_string()),
        ))
        .unwrap_err();
        assert_eq!(err.server_message(), Some("Invalid credentials"));
        assert_eq!(store.get(AUTH_TOKEN_KEY), None);
    }

    #[test]
    fn transport_failure_is_a_network_error() {
        let transport = FakeTransport::new(Err(TransportError::Network("offline".to_string())));
        let store = MemoryStorage::new();
        let err = block_on(submit_networked(
            &transport,
            &store,
            AuthMode::Login,
            &creds("a@b.co", "secret1", ""),
            Some("captcha".to_string()),
        ))
        .unwrap_err();
        assert_eq!(err.message_key(), "error_network");
        assert_eq!(transport.calls.get(), 1);
    }
}
