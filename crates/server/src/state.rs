use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cohort_core::config::AppConfig;
use cohort_core::errors::ApplicationError;
use cohort_core::{Dashboard, DashboardStats};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A scored dashboard and the moment it was built.
#[derive(Debug)]
pub struct Snapshot {
    pub dashboard: Dashboard,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(dashboard: Dashboard) -> Self {
        Self { dashboard, loaded_at: Utc::now() }
    }
}

/// Shared handler state. Readers clone the current `Arc<Snapshot>` and never
/// hold the lock while answering a query.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    requests: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: AppConfig, dashboard: Dashboard) -> Self {
        Self {
            config: Arc::new(config),
            snapshot: Arc::new(RwLock::new(Arc::new(Snapshot::new(dashboard)))),
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Loads and scores the configured sheets; used at startup.
    pub fn load(config: AppConfig) -> Result<Self, ApplicationError> {
        let dashboard = Dashboard::load(&config)?;
        Ok(Self::new(config, dashboard))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    pub fn next_correlation_id(&self) -> String {
        let sequence = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req-{sequence}")
    }

    /// Rebuilds the snapshot from the configured sources. The new snapshot is
    /// built before the write lock is taken; on failure the old one stays.
    pub async fn reload(&self) -> Result<DashboardStats, ApplicationError> {
        let config = Arc::clone(&self.config);
        let built = tokio::task::spawn_blocking(move || Dashboard::load(&config))
            .await
            .map_err(|error| ApplicationError::Load(format!("reload task failed: {error}")))?;

        let dashboard = match built {
            Ok(dashboard) => dashboard,
            Err(error) => {
                warn!(
                    event_name = "system.server.reload_failed",
                    error_class = error.error_class(),
                    error = %error,
                    "reload failed; previous snapshot kept"
                );
                return Err(error);
            }
        };

        let stats = dashboard.stats();
        *self.snapshot.write().await = Arc::new(Snapshot::new(dashboard));
        info!(
            event_name = "system.server.reloaded",
            invoices = stats.invoices,
            customers = stats.customers,
            "snapshot reloaded"
        );
        Ok(stats)
    }
}
