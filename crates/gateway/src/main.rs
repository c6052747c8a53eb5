//! TalentForge API Gateway
//!
//! Binary entry point: loads configuration, wires telemetry and the
//! database, then serves the router until a shutdown signal arrives.

use anyhow::{anyhow, Context};
use std::net::SocketAddr;
use talentforge_common::{auth::JwtManager, config::AppConfig, db::schema, db::DbPool};
use talentforge_gateway::{create_router, telemetry, AppState};
use tokio::{signal, sync::oneshot};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    telemetry::init_tracing(&config.observability);
    info!("Starting TalentForge API Gateway v{}", talentforge_common::VERSION);
    telemetry::init_metrics(&config.observability)?;

    let secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| anyhow!("auth.jwt_secret must be set"))?;
    let jwt = JwtManager::new(&secret, config.auth.jwt_expiration_secs);

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        schema::create_tables(db.write()).await?;
        info!("Database schema is up to date");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let grace = config.shutdown_timeout();

    let app = create_router(AppState::new(config, db, jwt));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    let (stop, stopped) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stopped.await.ok();
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    stop.send(()).ok();
    match tokio::time::timeout(grace, server).await {
        Ok(result) => result??,
        Err(_) => warn!(grace_secs = grace.as_secs(), "In-flight requests did not drain in time"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
