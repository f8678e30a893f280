use std::net::SocketAddr;

use anyhow::{Context, Result};
use farmlink::{
    configuration::get_configuration, database::setup_database, server::configure_app,
    telemetry::{init_tracing, DEFAULT_FILTER},
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing(DEFAULT_FILTER);

    let settings = get_configuration().context("Failed to read configuration")?;

    let pool = setup_database(&settings.database)
        .await
        .context("Failed to set up database")?;

    let app = configure_app(pool, settings.auth.clone());

    let addr: SocketAddr = format!("{}:{}", settings.application.host, settings.application.port)
        .parse()
        .context("Invalid application host/port")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("FarmLink API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
