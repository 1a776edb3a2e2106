use std::sync::Arc;

use anyhow::Context;
use argon2::Params;
use common_auth::{JwtConfig, TokenService};
use message_service::{
    app::SendClock, build_router, config::ServiceConfig, metrics::MessagingMetrics,
    passwords::Argon2Passwords, store::InMemoryStore, AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;
    let jwt_config = JwtConfig::from_env().context("Failed to load JWT configuration")?;
    if jwt_config.using_fallback_secret {
        warn!("message-service is signing tokens with the development secret");
    }
    let tokens = TokenService::from_config(&jwt_config)
        .context("Failed to build token service")?;
    let passwords = Argon2Passwords::new(Params::default())
        .map_err(|err| anyhow::anyhow!("Failed to initialise password hasher: {err}"))?;

    let addr = config.socket_addr();
    let state = AppState {
        store: Arc::new(InMemoryStore::new()),
        tokens: Arc::new(tokens),
        passwords: Arc::new(passwords),
        config: Arc::new(config),
        metrics: Arc::new(MessagingMetrics::new()?),
        send_clock: Arc::new(SendClock::default()),
    };

    let app = build_router(state);

    info!(%addr, algorithm = %jwt_config.algorithm, "starting message-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
