use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, AuthSettings, ServerConfig};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::auth::ServerState;
use crate::routes;
use service::auth::{repo::seaorm::SeaOrmAuthRepository, service::AuthConfig, AuthService};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Translate `[auth]` settings into the service configuration
pub fn auth_config(settings: &AuthSettings) -> anyhow::Result<AuthConfig> {
    let token_ttl = match settings.token_ttl_secs {
        Some(secs) => Some(
            i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .ok_or_else(|| anyhow::anyhow!("auth.token_ttl_secs = {secs} is out of range"))?,
        ),
        None => None,
    };
    Ok(AuthConfig { token_name: settings.token_name.clone(), token_ttl })
}

fn bind_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", server.host, server.port).parse()?)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
    }
}

/// Build the router against an already-connected database
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.auth.run_migrations {
        models::db::migrate(&db).await?;
        info!("migrations applied");
    }
    let repo = Arc::new(SeaOrmAuthRepository::new(db));
    let auth = AuthService::new(repo, auth_config(&cfg.auth)?);
    Ok(routes::build_router(ServerState::new(auth), build_cors()))
}

/// Public entry: load config, build the app and run the HTTP server until Ctrl+C
pub async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_env()?;
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, token_ttl_secs = ?cfg.auth.token_ttl_secs, "starting auth gateway");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
