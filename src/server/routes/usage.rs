//! Daily usage endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{latest_pass, parse_date};
use crate::server::state::AppState;
use crate::store::{filter_events_by_date, SessionEvent};
use crate::winapi_utils::{current_uptime, SystemUptime};

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    /// Active seconds keyed by local date (YYYY-MM-DD)
    pub daily_usage: BTreeMap<String, i64>,
    pub total_secs: i64,
    /// Session boundaries, limited to `date` when one was given
    pub events: Vec<SessionEvent>,
    /// Boot time and uptime, only when reporting on today
    pub system: Option<SystemUptime>,
    /// Why the event log contributed nothing, if it did not
    pub unavailable: Option<String>,
}

/// GET /api/usage - Active time per day from session events.
///
/// With `date`, only that day is returned (zero if it has no sessions).
pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, StatusCode> {
    let date = parse_date(query.date.as_deref())?;
    let pass = latest_pass(&state)?;
    let today = Local::now().date_naive();

    let (daily_usage, events) = match date {
        Some(d) => {
            let secs = pass.daily_usage.get(d).map_or(0, |t| t.num_seconds());
            (
                BTreeMap::from([(d.to_string(), secs)]),
                filter_events_by_date(&pass.session_events, d, &Local),
            )
        }
        None => (pass.daily_usage.to_secs_map(), pass.session_events),
    };

    let system = if date.map_or(true, |d| d == today) {
        match current_uptime() {
            Ok(uptime) => Some(uptime),
            Err(e) => {
                tracing::debug!(error = %e, "Uptime unavailable");
                None
            }
        }
    } else {
        None
    };

    Ok(Json(UsageResponse {
        total_secs: daily_usage.values().sum(),
        daily_usage,
        events,
        system,
        unavailable: pass.event_log_unavailable,
    }))
}
