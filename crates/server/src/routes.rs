//! Query endpoints over the current snapshot.
//!
//! - `GET  /segments?name=`               segment lookup by name substring
//! - `GET  /customers/monthly?name=&year=` twelve-month invoice counts
//! - `GET  /customers/names`              distinct names and years
//! - `GET  /recommendations?product=`     recommendation lookup
//! - `POST /reload`                       rebuild the snapshot from disk

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use cohort_core::{DashboardStats, MonthlySeries, RecommendationGroup, SegmentMatch};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SegmentQuery {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthlyQuery {
    pub name: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub product: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub name: String,
    pub matches: Vec<SegmentMatch>,
}

#[derive(Debug, Serialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
    pub years: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub product: Option<String>,
    pub groups: Vec<RecommendationGroup>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub stats: DashboardStats,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/segments", get(segments))
        .route("/customers/monthly", get(monthly))
        .route("/customers/names", get(names))
        .route("/recommendations", get(recommendations))
        .route("/reload", post(reload))
}

pub async fn segments(
    State(state): State<AppState>,
    Query(query): Query<SegmentQuery>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let Some(name) = query.name else {
        return Err(ApiError::invalid_query(
            "query parameter `name` is required",
            state.next_correlation_id(),
        ));
    };

    let snapshot = state.snapshot().await;
    let matches = snapshot.dashboard.lookup_segment(&name);
    debug!(event_name = "system.server.segments", name = %name, matches = matches.len());
    Ok(Json(SegmentResponse { name, matches }))
}

pub async fn monthly(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Json<MonthlySeries>, ApiError> {
    let name = query.name.filter(|name| !name.trim().is_empty()).ok_or_else(|| {
        ApiError::invalid_query("query parameter `name` is required", state.next_correlation_id())
    })?;
    let raw_year = query.year.ok_or_else(|| {
        ApiError::invalid_query("query parameter `year` is required", state.next_correlation_id())
    })?;
    let year = raw_year.trim().parse::<i32>().map_err(|_| {
        ApiError::invalid_query(
            format!("query parameter `year` must be an integer, got `{raw_year}`"),
            state.next_correlation_id(),
        )
    })?;

    let snapshot = state.snapshot().await;
    Ok(Json(snapshot.dashboard.monthly_purchases(&name, year)))
}

pub async fn names(State(state): State<AppState>) -> Json<NamesResponse> {
    let snapshot = state.snapshot().await;
    Json(NamesResponse {
        names: snapshot.dashboard.customer_names(),
        years: snapshot.dashboard.years(),
    })
}

pub async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Json<RecommendationResponse> {
    let snapshot = state.snapshot().await;
    let groups = match query.product.as_deref() {
        Some(product) => snapshot.dashboard.recommend(product),
        None => snapshot.dashboard.recommendations().groups().to_vec(),
    };
    Json(RecommendationResponse { product: query.product, groups })
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    match state.reload().await {
        Ok(stats) => Ok(Json(ReloadResponse { status: "reloaded", stats })),
        Err(error) => Err(ApiError::new(error, state.next_correlation_id())),
    }
}
