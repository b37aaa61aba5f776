//! Execution history endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{latest_pass, parse_date};
use crate::collect::SourceStatus;
use crate::server::state::AppState;
use crate::store::{filter_user_programs, ExecutionRecord};

#[derive(Debug, Default, Deserialize)]
pub struct ExecutionsQuery {
    /// Restrict to one local date (YYYY-MM-DD)
    pub date: Option<String>,
    /// Hide OS services
    #[serde(default)]
    pub user_only: bool,
}

#[derive(Debug, Serialize)]
pub struct ExecutionsResponse {
    pub collected_at: DateTime<Utc>,
    pub date: Option<String>,
    pub programs: Vec<ExecutionRecord>,
    pub run_history: Vec<ExecutionRecord>,
    pub sources: Vec<SourceStatus>,
}

#[derive(Debug, Serialize)]
pub struct RunHistoryResponse {
    pub entries: Vec<ExecutionRecord>,
}

/// GET /api/executions - Reconciled program list from the latest pass.
///
/// Query params:
/// - `date`: Only programs last run on this local date
/// - `user_only`: Drop programs matching the configured system patterns
pub async fn get_executions(
    State(state): State<AppState>,
    Query(query): Query<ExecutionsQuery>,
) -> Result<Json<ExecutionsResponse>, StatusCode> {
    let date = parse_date(query.date.as_deref())?;
    let pass = latest_pass(&state)?;

    let history = match date {
        Some(d) => pass.history.for_date(d),
        None => pass.history,
    };
    let mut view = history.reconciled();

    if query.user_only {
        view.programs = filter_user_programs(&view.programs, &state.config.system_patterns);
    }

    Ok(Json(ExecutionsResponse {
        collected_at: pass.collected_at,
        date: query.date,
        programs: view.programs,
        run_history: view.run_history,
        sources: pass.statuses,
    }))
}

/// GET /api/run-history - Run dialog commands, most recent first.
pub async fn get_run_history(
    State(state): State<AppState>,
) -> Result<Json<RunHistoryResponse>, StatusCode> {
    let pass = latest_pass(&state)?;
    Ok(Json(RunHistoryResponse {
        entries: pass.history.run_history,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::server::routes::tests::{empty_state, fixture_state};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_executions_reconciled() {
        let Json(response) = get_executions(State(fixture_state()), Query(ExecutionsQuery::default()))
            .await
            .unwrap();

        let programs: Vec<_> = response.programs.iter().map(|r| r.program.as_str()).collect();
        assert_eq!(programs, ["game.exe", "chrome.exe", "NOTEPAD.EXE"]);
        assert_eq!(response.run_history.len(), 2);
        assert_eq!(response.sources.len(), 4);
    }

    #[tokio::test]
    async fn test_executions_user_only() {
        let config = EngineConfig {
            system_patterns: vec!["CHROME".to_string()],
            ..EngineConfig::default()
        };
        let state = AppState {
            config: Arc::new(config),
            ..fixture_state()
        };
        let query = ExecutionsQuery {
            user_only: true,
            ..Default::default()
        };

        let Json(response) = get_executions(State(state), Query(query)).await.unwrap();

        assert_eq!(response.programs.len(), 2);
        assert!(response.programs.iter().all(|r| r.program != "chrome.exe"));
    }

    #[tokio::test]
    async fn test_executions_bad_date() {
        let query = ExecutionsQuery {
            date: Some("yesterday".to_string()),
            ..Default::default()
        };

        let result = get_executions(State(fixture_state()), Query(query)).await;

        assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_executions_before_first_pass() {
        let result = get_executions(State(empty_state()), Query(ExecutionsQuery::default())).await;
        assert_eq!(result.err(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_run_history() {
        let Json(response) = get_run_history(State(fixture_state())).await.unwrap();

        let commands: Vec<_> = response.entries.iter().map(|r| r.program.as_str()).collect();
        assert_eq!(commands, ["cmd", "regedit"]);
    }
}
