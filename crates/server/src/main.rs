use std::net::SocketAddr;

use anyhow::Context;
use server::{deployment::Deployment, routes};
use services::services::{config::Config, database_validator::DatabaseValidator};
use tracing::{info, warn};
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {e}");
        }
    }
    init_tracing("info");

    let config = Config::from_env()?;
    info!(data_dir = %config.data_dir.display(), "Starting formula operator");

    let deployment = Deployment::new(config.clone())
        .await
        .context("failed to initialise deployment")?;

    let report = DatabaseValidator::new(deployment.db().pool.clone())
        .validate()
        .await?;
    if !report.is_ok() {
        warn!("{}", report.summary());
    }

    let app = routes::router(deployment);
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
