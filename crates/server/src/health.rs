use axum::{extract::State, routing::get, Json, Router};
use chrono::{NaiveDate, Utc};
use cohort_core::DashboardStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotCheck {
    pub status: &'static str,
    pub loaded_at: String,
    pub reference_date: NaiveDate,
    pub stats: DashboardStats,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub snapshot: SnapshotCheck,
    pub checked_at: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// A running server always holds a scored snapshot, so health is `ready`
/// whenever it answers.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.snapshot().await;

    Json(HealthResponse {
        status: "ready",
        snapshot: SnapshotCheck {
            status: "ready",
            loaded_at: snapshot.loaded_at.to_rfc3339(),
            reference_date: snapshot.dashboard.scoring().reference_date,
            stats: snapshot.dashboard.stats(),
        },
        checked_at: Utc::now().to_rfc3339(),
    })
}
