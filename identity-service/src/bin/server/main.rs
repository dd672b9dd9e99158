use std::sync::Arc;

use auth::Argon2Hasher;
use auth::JwtIssuer;
use identity_service::config::Config;
use identity_service::identity::ports::AuthServicePort;
use identity_service::identity::service::AuthService;
use identity_service::inbound::http::router::create_router;
use identity_service::repositories::InMemoryIdentityRepository;
use identity_service::repositories::PostgresIdentityRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        request_timeout_secs = config.server.request_timeout_secs,
        persistent_store = config.database.url.is_some(),
        jwt_issuer = %config.jwt.issuer,
        jwt_expiration_hours = config.jwt.expiration_hours,
        "Configuration loaded"
    );

    let token_lifetime = chrono::Duration::try_hours(config.jwt.expiration_hours)
        .ok_or_else(|| anyhow::anyhow!("jwt.expiration_hours is out of range"))?;
    let token_issuer = Arc::new(JwtIssuer::new(
        config.jwt.secret.as_bytes(),
        config.jwt.issuer.clone(),
        token_lifetime,
    )?);
    let password_hasher = Arc::new(Argon2Hasher::new());

    let auth_service: Arc<dyn AuthServicePort> = match &config.database.url {
        Some(url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            let repository = Arc::new(PostgresIdentityRepository::new(pg_pool));
            Arc::new(AuthService::new(repository, password_hasher, token_issuer))
        }
        None => {
            tracing::warn!("No database url configured, identities are kept in memory only");
            let repository = Arc::new(InMemoryIdentityRepository::new());
            Arc::new(AuthService::new(repository, password_hasher, token_issuer))
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, config.server.request_timeout());
    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
