//! Period summary endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;

use crate::server::state::AppState;
use crate::store::PeriodSummary;

/// Longest window the endpoint will fold.
const MAX_DAYS: u32 = 366;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<u32>,
}

/// GET /api/summary - Totals and top-10 rankings over recent snapshots.
///
/// `days` defaults to the configured summary window.
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<PeriodSummary>, StatusCode> {
    let days = query
        .days
        .unwrap_or(state.config.summary_window_days)
        .min(MAX_DAYS);

    let db = state
        .database
        .as_ref()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match db.summarize_recent(days, Local::now().date_naive()) {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build summary");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
