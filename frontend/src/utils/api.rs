use gloo_net::http::{Request, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::config;
use crate::utils::storage::{StorageHandle, AUTH_TOKEN_KEY};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("could not encode request: {0}")]
    Encode(String),
}

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Backend client. Requests carry the stored bearer token when there is one.
pub struct Api;

/// Credential exchange. A 401 here is a bad password, not a dead session.
const AUTH_PATH: &str = "/api/auth";

/// Whether a 401 on `path` proves the token that was sent is no longer valid.
fn token_rejected(path: &str, sent_token: bool, status: u16) -> bool {
    status == 401 && sent_token && path != AUTH_PATH
}

pub struct RequestWrapper {
    request: Request,
    path: String,
    sent_token: bool,
    storage: StorageHandle,
}

impl RequestWrapper {
    fn new(path: &str, method: &str, storage: StorageHandle) -> Self {
        let full_url = format!("{}{}", config::get_backend_url(), path);
        let mut request = match method {
            "POST" => Request::post(&full_url),
            _ => Request::get(&full_url),
        };
        let token = storage.get(AUTH_TOKEN_KEY);
        if let Some(token) = &token {
            request = request.header("Authorization", &format!("Bearer {}", token));
        }
        Self {
            request,
            path: path.to_string(),
            sent_token: token.is_some(),
            storage,
        }
    }

    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, TransportError> {
        self.request = self
            .request
            .json(data)
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        Ok(self)
    }

    /// Sends once, no retry. A 401 from a protected route means the stored
    /// token is dead, so it is dropped before the response is handed back.
    pub async fn send(self) -> Result<Response, TransportError> {
        let response = self
            .request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if token_rejected(&self.path, self.sent_token, response.status()) {
            log::info!("Stored session rejected, clearing token");
            self.storage.remove(AUTH_TOKEN_KEY);
        }
        Ok(response)
    }
}

impl Api {
    pub fn get(path: &str, storage: StorageHandle) -> RequestWrapper {
        RequestWrapper::new(path, "GET", storage)
    }

    pub fn post(path: &str, storage: StorageHandle) -> RequestWrapper {
        RequestWrapper::new(path, "POST", storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_session_token_is_dropped() {
        assert!(token_rejected("/api/auth/session", true, 401));
        assert!(token_rejected("/api/auth/logout", true, 401));
    }

    #[test]
    fn failed_login_keeps_the_existing_session() {
        assert!(!token_rejected("/api/auth", true, 401));
    }

    #[test]
    fn other_responses_leave_the_token_alone() {
        assert!(!token_rejected("/api/auth/session", false, 401));
        assert!(!token_rejected("/api/auth/session", true, 200));
        assert!(!token_rejected("/api/auth/session", true, 500));
    }
}
