use std::sync::Arc;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use nonzero_ext::nonzero;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_sessions::session_store::ExpiredDeletion;
use tracing::Level;

pub mod config;
pub mod error;
pub mod schema;
pub mod models {
    pub mod user_models;
}
pub mod repositories {
    pub mod user_core;
    pub mod session_repository;
}
pub mod handlers {
    pub mod auth_dtos;
    pub mod auth_middleware;
    pub mod auth_handlers;
    pub mod oauth_handlers;
}
pub mod utils {
    pub mod captcha;
    pub mod oauth_providers;
    pub mod oauth_state_store;
}

use config::Config;
use handlers::{auth_handlers, oauth_handlers};
use repositories::{session_repository::SessionRepository, user_core::UserCore};
use utils::captcha::CaptchaVerifier;
use utils::oauth_providers::{IdentityExchange, OAuthClients};
use utils::oauth_state_store::OAuthStateStore;

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type LoginLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    if !applied.is_empty() {
        tracing::info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

pub struct AppState {
    pub config: Config,
    pub user_core: Arc<UserCore>,
    pub session_repository: Arc<SessionRepository>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub oauth_clients: Arc<OAuthClients>,
    pub identity_exchange: Arc<dyn IdentityExchange>,
    /// Pending oauth popups: csrf token, pkce verifier and nonce per record.
    pub oauth_store: OAuthStateStore,
    /// 5 attempts per minute, keyed by normalized email.
    pub login_limiter: LoginLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: DbPool,
        captcha: Arc<dyn CaptchaVerifier>,
        oauth_clients: Arc<OAuthClients>,
        identity_exchange: Arc<dyn IdentityExchange>,
    ) -> Self {
        Self {
            config,
            user_core: Arc::new(UserCore::new(pool.clone())),
            session_repository: Arc::new(SessionRepository::new(pool)),
            captcha,
            oauth_clients,
            identity_exchange,
            oauth_store: OAuthStateStore::default(),
            login_limiter: RateLimiter::keyed(Quota::per_minute(nonzero!(5u32))),
        }
    }

    /// Drops expired sessions, abandoned oauth records and limiter keys that
    /// have gone quiet. Run periodically from the server.
    pub async fn purge_stale(&self) {
        let now = chrono::Utc::now().timestamp() as i32;
        match self.session_repository.purge_expired(now) {
            Ok(0) => {}
            Ok(count) => tracing::info!("Purged {} expired sessions", count),
            Err(e) => tracing::error!("Failed to purge expired sessions: {}", e),
        }
        if let Err(e) = self.oauth_store.delete_expired().await {
            tracing::error!("Failed to purge oauth state: {}", e);
        }
        self.login_limiter.retain_recent();
        self.login_limiter.shrink_to_fit();
        tracing::debug!(
            oauth_pending = self.oauth_store.len(),
            limited_emails = self.login_limiter.len(),
            "Purged stale auth state"
        );
    }
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn app(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth", post(auth_handlers::authenticate))
        .route("/api/auth/oauth/{provider}", get(oauth_handlers::oauth_redirect))
        .route("/api/auth/callback", get(oauth_handlers::oauth_callback));

    // AuthUser extractor guards these
    let protected_routes = Router::new()
        .route("/api/auth/session", get(auth_handlers::session_status))
        .route("/api/auth/logout", post(auth_handlers::logout));

    let frontend_origin = state.config.frontend_origin();
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                    origin.as_bytes() == frontend_origin.as_bytes()
                }))
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                ])
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::OAuthCredentials;
    use crate::utils::captcha::MockCaptchaVerifier;
    use crate::utils::oauth_providers::MockIdentityExchange;

    pub fn memory_pool() -> DbPool {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        // One connection so every checkout sees the same in-memory database.
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create test pool");
        run_migrations(&pool).expect("Failed to migrate test database");
        pool
    }

    pub fn test_config() -> Config {
        let creds = |id: &str| Some(OAuthCredentials {
            client_id: id.to_string(),
            client_secret: "test-secret".to_string(),
        });
        Config {
            database_url: ":memory:".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            frontend_url: "http://localhost:8080".to_string(),
            server_url: "http://localhost:3000".to_string(),
            port: 3000,
            recaptcha_secret: None,
            google: creds("google-client"),
            yandex: creds("yandex-client"),
            vk: None,
            bcrypt_cost: 4,
        }
    }

    #[derive(Default)]
    pub struct TestDoubles {
        pub captcha: MockCaptchaVerifier,
        pub exchange: MockIdentityExchange,
    }

    pub fn test_state(doubles: TestDoubles) -> Arc<AppState> {
        let config = test_config();
        let oauth_clients = Arc::new(OAuthClients::from_config(&config).expect("test oauth clients"));
        Arc::new(AppState::new(
            config,
            memory_pool(),
            Arc::new(doubles.captcha),
            oauth_clients,
            Arc::new(doubles.exchange),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_public() {
        let state = test_support::test_state(Default::default());
        let response = app(state)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_only_allows_frontend_origin() {
        let state = test_support::test_state(Default::default());
        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/auth")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let allowed = app(state.clone()).oneshot(preflight("http://localhost:8080")).await.unwrap();
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:8080"
        );

        let denied = app(state).oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn purge_drops_abandoned_oauth_records() {
        use time::OffsetDateTime;
        use tower_sessions::session::{Id, Record};
        use tower_sessions::session_store::SessionStore;

        let state = test_support::test_state(Default::default());
        let mut abandoned = Record {
            id: Id(1),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() - time::Duration::minutes(1),
        };
        state.oauth_store.create(&mut abandoned).await.unwrap();
        state.login_limiter.check_key(&"busy@example.com".to_string()).unwrap();

        state.purge_stale().await;
        assert!(state.oauth_store.is_empty());
        // Still inside its window, so the key is kept.
        assert_eq!(state.login_limiter.len(), 1);
    }
}
