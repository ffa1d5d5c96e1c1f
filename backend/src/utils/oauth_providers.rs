use std::sync::Arc;
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient,
    AuthUrl,
    AuthorizationCode,
    ClientId,
    ClientSecret,
    EndpointNotSet,
    EndpointSet,
    PkceCodeVerifier,
    RedirectUrl,
    TokenResponse,
    TokenUrl,
};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{Config, ConfigError, OAuthCredentials};

const VK_API_VERSION: &str = "5.199";

pub type LoginOAuthClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Yandex,
    Vk,
}

impl OAuthProvider {
    pub fn slug(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Yandex => "yandex",
            OAuthProvider::Vk => "vk",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "google" => Some(OAuthProvider::Google),
            "yandex" => Some(OAuthProvider::Yandex),
            "vk" => Some(OAuthProvider::Vk),
            _ => None,
        }
    }

    fn auth_url(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::Yandex => "https://oauth.yandex.ru/authorize",
            OAuthProvider::Vk => "https://oauth.vk.com/authorize",
        }
    }

    fn token_url(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::Yandex => "https://oauth.yandex.ru/token",
            OAuthProvider::Vk => "https://oauth.vk.com/access_token",
        }
    }

    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            OAuthProvider::Google => &["openid", "email", "profile"],
            OAuthProvider::Yandex => &[],
            OAuthProvider::Vk => &["email"],
        }
    }
}

/// One configured oauth2 client per login provider. Providers without a
/// client id in the environment are left out and treated as unknown.
pub struct OAuthClients {
    google: Option<LoginOAuthClient>,
    yandex: Option<LoginOAuthClient>,
    vk: Option<LoginOAuthClient>,
}

impl OAuthClients {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let redirect = config.oauth_redirect_url();
        let build = |provider: OAuthProvider, creds: &Option<OAuthCredentials>| {
            creds
                .as_ref()
                .map(|creds| build_client(provider, creds, &redirect))
                .transpose()
        };
        Ok(Self {
            google: build(OAuthProvider::Google, &config.google)?,
            yandex: build(OAuthProvider::Yandex, &config.yandex)?,
            vk: build(OAuthProvider::Vk, &config.vk)?,
        })
    }

    pub fn get(&self, provider: OAuthProvider) -> Option<&LoginOAuthClient> {
        match provider {
            OAuthProvider::Google => self.google.as_ref(),
            OAuthProvider::Yandex => self.yandex.as_ref(),
            OAuthProvider::Vk => self.vk.as_ref(),
        }
    }
}

fn build_client(provider: OAuthProvider, creds: &OAuthCredentials, redirect: &str) -> Result<LoginOAuthClient, ConfigError> {
    let invalid = |e: url::ParseError| ConfigError::Invalid {
        name: "oauth endpoint",
        reason: format!("{}: {}", provider.slug(), e),
    };
    Ok(BasicClient::new(ClientId::new(creds.client_id.clone()))
        .set_client_secret(ClientSecret::new(creds.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(provider.auth_url().to_string()).map_err(invalid)?)
        .set_token_uri(TokenUrl::new(provider.token_url().to_string()).map_err(invalid)?)
        .set_redirect_uri(RedirectUrl::new(redirect.to_string()).map_err(invalid)?))
}

/// Profile data we keep from a provider after a successful login.
#[derive(Clone, Debug, PartialEq)]
pub struct OAuthIdentity {
    pub subject: String,
    pub email: String,
    /// Set only when the provider states it confirmed the address.
    pub email_verified: bool,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("provider is not configured")]
    NotConfigured,
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("profile request failed: {0}")]
    Profile(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// Trades an authorization code for the user's identity at `provider`.
    async fn exchange(&self, provider: OAuthProvider, code: String, pkce_verifier: String) -> Result<OAuthIdentity, OAuthError>;
}

pub struct HttpIdentityExchange {
    clients: Arc<OAuthClients>,
    http: reqwest::Client,
    vk: Option<OAuthCredentials>,
    redirect_url: String,
}

/// VK answers the code exchange with the user id and email in the token
/// response itself.
#[derive(Deserialize)]
struct VkTokenResponse {
    access_token: Option<String>,
    user_id: Option<i64>,
    email: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct VkUser {
    first_name: Option<String>,
    last_name: Option<String>,
    photo_200: Option<String>,
}

#[derive(Deserialize)]
struct VkUsersResponse {
    #[serde(default)]
    response: Vec<VkUser>,
}

fn vk_identity(body: &str) -> Result<(String, OAuthIdentity), OAuthError> {
    let token: VkTokenResponse = serde_json::from_str(body).map_err(|e| OAuthError::Exchange(e.to_string()))?;
    if let Some(error) = token.error {
        return Err(OAuthError::Exchange(format!(
            "{}: {}",
            error,
            token.error_description.unwrap_or_default()
        )));
    }
    let access_token = token.access_token.ok_or_else(|| OAuthError::Exchange("vk sent no access token".to_string()))?;
    let user_id = token.user_id.ok_or_else(|| OAuthError::Profile("vk sent no user id".to_string()))?;
    let email = token.email.ok_or_else(|| OAuthError::Profile("vk account has no email".to_string()))?;
    Ok((
        access_token,
        OAuthIdentity {
            subject: user_id.to_string(),
            email,
            email_verified: false,
            name: None,
            avatar: None,
        },
    ))
}

impl HttpIdentityExchange {
    pub fn new(config: &Config, clients: Arc<OAuthClients>, http: reqwest::Client) -> Self {
        Self {
            clients,
            http,
            vk: config.vk.clone(),
            redirect_url: config.oauth_redirect_url(),
        }
    }

    async fn vk_login(&self, code: String, pkce_verifier: String) -> Result<OAuthIdentity, OAuthError> {
        let creds = self.vk.as_ref().ok_or(OAuthError::NotConfigured)?;
        let body = self
            .http
            .post(OAuthProvider::Vk.token_url())
            .form(&[
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("code", code.as_str()),
                ("code_verifier", pkce_verifier.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?
            .text()
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;
        let (access_token, mut identity) = vk_identity(&body)?;

        // The name is nice to have; a failed lookup does not fail the login.
        let profile = self
            .http
            .get("https://api.vk.com/method/users.get")
            .query(&[
                ("user_ids", identity.subject.as_str()),
                ("fields", "photo_200"),
                ("access_token", access_token.as_str()),
                ("v", VK_API_VERSION),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match profile {
            Ok(response) => match response.json::<VkUsersResponse>().await {
                Ok(users) => {
                    if let Some(user) = users.response.into_iter().next() {
                        let name = [user.first_name, user.last_name]
                            .into_iter()
                            .flatten()
                            .collect::<Vec<_>>()
                            .join(" ");
                        identity.name = Some(name).filter(|n| !n.is_empty());
                        identity.avatar = user.photo_200;
                    }
                }
                Err(e) => tracing::warn!("Unreadable vk profile: {}", e),
            },
            Err(e) => tracing::warn!("vk profile lookup failed: {}", e),
        }
        Ok(identity)
    }

    async fn google_profile(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        #[derive(Deserialize)]
        struct GoogleUser {
            id: String,
            email: Option<String>,
            #[serde(default)]
            verified_email: bool,
            name: Option<String>,
            picture: Option<String>,
        }

        let user: GoogleUser = self
            .http
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OAuthError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        Ok(OAuthIdentity {
            subject: user.id,
            email: user.email.ok_or_else(|| OAuthError::Profile("google account has no email".to_string()))?,
            email_verified: user.verified_email,
            name: user.name,
            avatar: user.picture,
        })
    }

    async fn yandex_profile(&self, access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        #[derive(Deserialize)]
        struct YandexUser {
            id: String,
            default_email: Option<String>,
            real_name: Option<String>,
            display_name: Option<String>,
            default_avatar_id: Option<String>,
            #[serde(default)]
            is_avatar_empty: bool,
        }

        let user: YandexUser = self
            .http
            .get("https://login.yandex.ru/info?format=json")
            .header("Authorization", format!("OAuth {}", access_token))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OAuthError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        let avatar = match (&user.default_avatar_id, user.is_avatar_empty) {
            (Some(avatar_id), false) => Some(format!("https://avatars.yandex.net/get-yapic/{}/islands-200", avatar_id)),
            _ => None,
        };
        Ok(OAuthIdentity {
            subject: user.id,
            email: user.default_email.ok_or_else(|| OAuthError::Profile("yandex account has no email".to_string()))?,
            // login.yandex.ru does not say whether the address was confirmed.
            email_verified: false,
            name: user.real_name.or(user.display_name),
            avatar,
        })
    }
}

#[async_trait]
impl IdentityExchange for HttpIdentityExchange {
    async fn exchange(&self, provider: OAuthProvider, code: String, pkce_verifier: String) -> Result<OAuthIdentity, OAuthError> {
        let client = self.clients.get(provider).ok_or(OAuthError::NotConfigured)?;
        tracing::info!("Exchanging {} authorization code", provider.slug());

        // VK puts the email in its token response, so it has its own exchange.
        if provider == OAuthProvider::Vk {
            return self.vk_login(code, pkce_verifier).await;
        }
        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&self.http)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;
        let access_token = token.access_token().secret();

        if provider == OAuthProvider::Google {
            self.google_profile(access_token).await
        } else {
            self.yandex_profile(access_token).await
        }
    }
}
