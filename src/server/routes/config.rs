//! Configuration endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// Settings the running engine loaded
    pub effective: EngineConfig,
    /// Rows stored in the database
    pub settings: Vec<ConfigSetting>,
}

#[derive(Debug, Serialize)]
pub struct ConfigSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// GET /api/config - Get all configuration settings
pub async fn get_config(State(state): State<AppState>) -> Result<Json<ConfigResponse>, StatusCode> {
    let effective = state.config.as_ref().clone();

    let Some(db_arc) = state.database.as_ref() else {
        return Ok(Json(ConfigResponse {
            effective,
            settings: Vec::new(),
        }));
    };

    let db = db_arc
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match db.get_all_config() {
        Ok(config) => {
            let settings = config
                .into_iter()
                .map(|(key, value, description)| ConfigSetting {
                    key,
                    value,
                    description,
                })
                .collect();

            Ok(Json(ConfigResponse {
                effective,
                settings,
            }))
        }
        Err(e) => {
            tracing::error!(?e, "Failed to fetch config");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
