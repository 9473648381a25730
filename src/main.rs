use std::net::SocketAddr;
use std::sync::Arc;

use booker::{
    build_router,
    config::Config,
    db::Database,
    services::{AuthService, MailQueue, RedisBlocklist, SmtpEmailTransport, TokenCodec, UrlSafeSerializer},
    telemetry, AppState,
};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Fail fast on bad configuration
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        "Starting book catalogue service"
    );

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let blocklist = Arc::new(RedisBlocklist::new(&config.redis).await?);
    tracing::info!("Token blocklist initialized");

    let transport = SmtpEmailTransport::new(&config.smtp)?;
    let mailer = MailQueue::start(Arc::new(transport));
    tracing::info!("Mail queue started");

    let codec = TokenCodec::new(&config.jwt)?;
    let serializer =
        UrlSafeSerializer::new(&config.jwt.secret, config.link_token.max_age_seconds);

    let auth = AuthService::new(
        db.clone(),
        codec.clone(),
        blocklist.clone(),
        serializer,
        mailer,
        config.public_url.clone(),
    );

    let state = AppState {
        config: config.clone(),
        db,
        codec,
        blocklist,
        auth,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
