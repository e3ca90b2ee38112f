use anyhow::Result;
use cohort_core::config::{AppConfig, LoadOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Logging must be configured before anything else emits events.
    let config = AppConfig::load(LoadOptions::default())?;
    cohort_server::init_logging(&config);

    cohort_server::serve(config).await
}
