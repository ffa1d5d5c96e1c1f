use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Client credentials for one oauth login provider.
#[derive(Clone, Debug)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub server_url: String,
    pub port: u16,
    pub recaptcha_secret: Option<String>,
    pub google: Option<OAuthCredentials>,
    pub yandex: Option<OAuthCredentials>,
    pub vk: Option<OAuthCredentials>,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            Err(_) => 3000,
        };
        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                name: "BCRYPT_COST",
                reason: e.to_string(),
            })?,
            Err(_) => bcrypt::DEFAULT_COST,
        };
        let frontend_url = optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        url::Url::parse(&frontend_url).map_err(|e| ConfigError::Invalid {
            name: "FRONTEND_URL",
            reason: e.to_string(),
        })?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET_KEY")?,
            frontend_url,
            server_url: optional("SERVER_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            port,
            recaptcha_secret: optional("RECAPTCHA_SECRET_KEY"),
            google: credentials("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            yandex: credentials("YANDEX_CLIENT_ID", "YANDEX_CLIENT_SECRET"),
            vk: credentials("VK_CLIENT_ID", "VK_CLIENT_SECRET"),
            bcrypt_cost,
        })
    }

    /// Origin the oauth callback page is allowed to post the token to.
    pub fn frontend_origin(&self) -> String {
        match url::Url::parse(&self.frontend_url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn oauth_redirect_url(&self) -> String {
        format!("{}/api/auth/callback", self.server_url.trim_end_matches('/'))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn credentials(id_var: &str, secret_var: &str) -> Option<OAuthCredentials> {
    let client_id = optional(id_var)?;
    Some(OAuthCredentials {
        client_id,
        client_secret: optional(secret_var).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(frontend_url: &str) -> Config {
        Config {
            database_url: ":memory:".to_string(),
            jwt_secret: "secret".to_string(),
            frontend_url: frontend_url.to_string(),
            server_url: "http://localhost:3000/".to_string(),
            port: 3000,
            recaptcha_secret: None,
            google: None,
            yandex: None,
            vk: None,
            bcrypt_cost: 4,
        }
    }

    #[test]
    fn frontend_origin_drops_path() {
        assert_eq!(config("https://yappertar.ai/app/").frontend_origin(), "https://yappertar.ai");
        assert_eq!(config("http://localhost:8080").frontend_origin(), "http://localhost:8080");
    }

    #[test]
    fn redirect_url_has_single_slash() {
        assert_eq!(config("http://localhost:8080").oauth_redirect_url(), "http://localhost:3000/api/auth/callback");
    }
}
