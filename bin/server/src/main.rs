use kateglo_platform_access::SessionTokens;
use kateglo_server::{
    auth::{AppState, GoogleOAuthClient},
    config::ServerConfig,
    error::StartupError,
};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> kateglo_core::Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    let tokens = SessionTokens::new(&config.session);
    if !tokens.is_configured() {
        tracing::warn!("SESSION__JWT_SECRET is not set; logins and protected routes are unavailable");
    }

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
        .connect(&config.database_url)
        .await
        .map_err(|e| StartupError::Database {
            details: e.to_string(),
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| StartupError::Database {
            details: e.to_string(),
        })?;

    let google = GoogleOAuthClient::new(config.google.clone()).map_err(|e| {
        StartupError::HttpClient {
            details: e.to_string(),
        }
    })?;

    let state = AppState::new(
        db_pool,
        google,
        tokens,
        config.frontend.allow_list(),
        config.admin_emails(),
    );
    let app = kateglo_server::app(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app).await.map_err(|e| StartupError::Serve {
        details: e.to_string(),
    })?;

    Ok(())
}
