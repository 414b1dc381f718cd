mod adapters;
mod api;
mod config;
mod domain;
mod engine;
mod strategy;

use eyre::{Result, WrapErr};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::adapters::delta::DeltaClient;
use crate::adapters::notifier::LogNotifier;
use crate::config::Config;
use crate::engine::ledger::PositionLedger;
use crate::engine::straddle::StraddleExecutor;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "straddle_bot=info,tower_http=info".into()),
        )
        .init();

    info!("🤖 Delta Exchange short straddle bot starting up...");

    let config = Config::load()?;
    info!(
        base_url = %config.exchange.base_url,
        stop_loss_multiplier = config.strategy.stop_loss_multiplier,
        "Config loaded"
    );

    let client = DeltaClient::new(config.exchange).wrap_err("Failed to build Delta client")?;

    // Shared for the life of the process
    let ledger = PositionLedger::new();
    let executor = StraddleExecutor::new(
        Arc::new(client),
        Arc::new(LogNotifier),
        ledger.clone(),
        config.strategy.clone(),
    );

    let app_state = Arc::new(api::AppState {
        executor: Arc::new(executor),
        ledger,
        start_time: Instant::now(),
    });
    let app = api::router(app_state);

    let port = config.server_port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| format!("Failed to bind port {}", port))?;
    info!("Trigger API running on http://0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Bot shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
