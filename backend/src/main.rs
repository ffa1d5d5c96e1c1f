use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use backend::{
    app,
    config::Config,
    run_migrations,
    utils::captcha::RecaptchaVerifier,
    utils::oauth_providers::{HttpIdentityExchange, OAuthClients},
    AppState,
};

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Only report to sentry when a DSN is configured.
    let _guard = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((dsn, sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        }))
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,yappertar_backend=debug,backend=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let manager = ConnectionManager::<SqliteConnection>::new(config.database_url.clone());
    let pool = r2d2::Pool::builder()
        .build(manager)
        .context("Failed to create pool")?;
    run_migrations(&pool)?;

    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build http client")?;
    if config.recaptcha_secret.is_none() {
        tracing::warn!("RECAPTCHA_SECRET_KEY not set, captcha checks are disabled");
    }
    let captcha = Arc::new(RecaptchaVerifier::new(http.clone(), config.recaptcha_secret.clone()));
    let oauth_clients = Arc::new(OAuthClients::from_config(&config)?);
    let identity_exchange = Arc::new(HttpIdentityExchange::new(&config, oauth_clients.clone(), http));

    let port = config.port;
    let state = Arc::new(AppState::new(config, pool, captcha, oauth_clients, identity_exchange));

    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            purge_state.purge_stale().await;
        }
    });

    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
