use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use auth_service::metrics::AuthMetrics;
use auth_service::postgres::{PgPermissionStore, PgRoleStore, PgUserStore};
use auth_service::{build_router, cors_layer, load_service_config, AppState};
use common_auth::TokenService;
use common_rbac::Repositories;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = load_service_config()?;

    let repos = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("Failed to connect to DATABASE_URL")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            Repositories::new(
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgRoleStore::new(pool.clone())),
                Arc::new(PgPermissionStore::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory stores");
            Repositories::in_memory()
        }
    };

    // Fresh secret per process: restarting invalidates every session.
    let tokens = Arc::new(TokenService::new(config.auth.sources)?);
    let metrics = Arc::new(AuthMetrics::new()?);
    let state = AppState::new(&config, tokens, repos, metrics)?;
    let app = build_router(state, cors_layer(&config.allow_origins));

    let ip: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((ip, config.port));
    info!(%addr, "starting auth-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
