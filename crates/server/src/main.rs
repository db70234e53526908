mod bootstrap;
mod health;
mod webhook;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use armbot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use armbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let webhook_state = webhook::WebhookState::new(app.machine, app.states, app.replies);
    let router = webhook::router(webhook_state);

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "webhook endpoint listening"
    );

    let shutdown_grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let server =
        axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).into_future();

    // In-flight requests get `graceful_shutdown_secs` to finish once the
    // signal lands; after that the process exits regardless.
    tokio::select! {
        result = server => result?,
        () = drain_deadline(shutdown_grace) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                grace_secs = shutdown_grace.as_secs(),
                "drain window elapsed before all requests finished"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "armbot-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(
        event_name = "system.server.shutdown_signal",
        correlation_id = "shutdown",
        "shutdown signal received, draining in-flight requests"
    );
}

async fn drain_deadline(grace: Duration) {
    let _ = tokio::signal::ctrl_c().await;
    tokio::time::sleep(grace).await;
}
