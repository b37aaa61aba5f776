//! Route handlers module.

pub mod config;
pub mod executions;
pub mod health;
pub mod summary;
pub mod usage;

use axum::http::StatusCode;
use chrono::NaiveDate;

use crate::collect::CollectionPass;
use crate::database::DATE_FORMAT;
use crate::server::state::AppState;

/// Parses an optional `YYYY-MM-DD` query value.
pub(crate) fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, StatusCode> {
    match value {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, DATE_FORMAT)
            .map(Some)
            .map_err(|_| StatusCode::BAD_REQUEST),
    }
}

/// Clones the latest pass, or 503 if collection has not finished yet.
pub(crate) fn latest_pass(state: &AppState) -> Result<CollectionPass, StatusCode> {
    let latest = state
        .latest
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    latest.clone().ok_or(StatusCode::SERVICE_UNAVAILABLE)
}
