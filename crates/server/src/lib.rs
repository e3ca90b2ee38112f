pub mod error;
pub mod health;
pub mod routes;
pub mod state;

use anyhow::Result;
use axum::Router;
use cohort_core::config::{AppConfig, LogFormat};
use tracing::info;

pub use error::{ApiError, ErrorBody};
pub use state::{AppState, Snapshot};

pub fn router(state: AppState) -> Router {
    Router::new().merge(health::router()).merge(routes::router()).with_state(state)
}

pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

/// Scores the configured sheets, then serves until ctrl-c. A load or scoring
/// failure aborts startup.
pub async fn serve(config: AppConfig) -> Result<()> {
    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let state = AppState::load(config)?;
    let stats = state.snapshot().await.dashboard.stats();

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.server.started",
        bind_address = %address,
        invoices = stats.invoices,
        customers = stats.customers,
        "cohort-server listening"
    );

    axum::serve(listener, router(state)).with_graceful_shutdown(wait_for_shutdown()).await?;

    info!(event_name = "system.server.stopping", "cohort-server stopping");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
