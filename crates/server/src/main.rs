use anyhow::Context;
use clap::Parser;
use db::DBService;
use server::{AppState, routes};
use services::services::config::ForecastConfig;
use tracing::info;
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let config = ForecastConfig::parse();
    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let state = AppState::new(db, config.clone());
    match state.skill_cache().initialize().await {
        Ok(entries) => info!(entries, "Skill cache warmed"),
        Err(e) => tracing::warn!(error = %e, "Skill cache warm-up failed; will retry on first use"),
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Practice forecast server listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}
