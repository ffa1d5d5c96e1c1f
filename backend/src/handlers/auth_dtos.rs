use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Register,
    /// Anything other than `register` logs in.
    #[default]
    #[serde(other)]
    Login,
}

/// Body of `POST /api/auth`. Missing fields deserialize to empty values so
/// the handler can answer with its own validation message.
#[derive(Deserialize, Clone)]
pub struct AuthRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub action: AuthAction,
    #[serde(default, rename = "captchaToken")]
    pub captcha_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub user_id: i32,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub email: String,
    pub exp: i64,
    pub jti: String, // unique per issued token so sessions never collide
}

#[derive(Deserialize)]
pub struct OAuthStartQuery {
    pub nonce: Option<String>,
}

#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_defaults_to_login() {
        let req: AuthRequest = serde_json::from_str(r#"{"email":"a@b.co","password":"secret"}"#).unwrap();
        assert_eq!(req.action, AuthAction::Login);
        assert!(req.captcha_token.is_empty());
    }

    #[test]
    fn register_request_reads_camel_case_captcha() {
        let req: AuthRequest = serde_json::from_str(
            r#"{"email":"a@b.co","password":"secret","action":"register","captchaToken":"tok"}"#,
        )
        .unwrap();
        assert_eq!(req.action, AuthAction::Register);
        assert_eq!(req.captcha_token, "tok");
    }

    #[test]
    fn unknown_action_falls_back_to_login() {
        let req: AuthRequest =
            serde_json::from_str(r#"{"email":"a@b.co","password":"secret","action":"signin"}"#).unwrap();
        assert_eq!(req.action, AuthAction::Login);
    }

    #[test]
    fn response_uses_user_id_camel_case() {
        let body = serde_json::to_value(AuthResponse { token: "t".into(), user_id: 7 }).unwrap();
        assert_eq!(body["userId"], 7);
    }
}
