//! Engine settings.
//!
//! Settings live in the `config` table of the snapshot database and are
//! seeded with the defaults below on first open. Missing or unparseable
//! values fall back to the default.

use crate::database::Database;
use crate::store::DEFAULT_SYSTEM_PATTERNS;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

/// Default API port.
pub const DEFAULT_PORT: u16 = 13240;

/// Event log retention rarely reaches this far back.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// How far back to query session events.
    pub lookback_days: u32,

    /// Window for the period summary.
    pub summary_window_days: u32,

    /// Upper bound on the event log query.
    pub event_query_timeout: Duration,

    /// Port for the local JSON API.
    pub server_port: u16,

    /// Program name fragments hidden from the user program view.
    pub system_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            summary_window_days: 7,
            event_query_timeout: Duration::from_secs(30),
            server_port: DEFAULT_PORT,
            system_patterns: DEFAULT_SYSTEM_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Reads settings from the database, keeping defaults for anything unusable.
    pub fn load(db: &Database) -> Self {
        let defaults = Self::default();
        let get = |key: &str| match db.get_config(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read config value");
                None
            }
        };

        Self {
            lookback_days: clamp_lookback(parse_or(get("lookback_days"), defaults.lookback_days)),
            summary_window_days: parse_or(get("summary_window_days"), defaults.summary_window_days),
            event_query_timeout: Duration::from_secs(parse_or(
                get("event_query_timeout_secs"),
                defaults.event_query_timeout.as_secs(),
            )),
            server_port: parse_or(get("server_port"), defaults.server_port),
            system_patterns: get("system_patterns")
                .map(|v| split_patterns(&v))
                .unwrap_or(defaults.system_patterns),
        }
    }

    /// Settings as `(key, value, description)` rows for seeding.
    pub fn as_settings(&self) -> Vec<(&'static str, String, &'static str)> {
        vec![
            (
                "lookback_days",
                self.lookback_days.to_string(),
                "Days of session events to query",
            ),
            (
                "summary_window_days",
                self.summary_window_days.to_string(),
                "Days covered by the period summary",
            ),
            (
                "event_query_timeout_secs",
                self.event_query_timeout.as_secs().to_string(),
                "Event log query timeout (seconds)",
            ),
            (
                "server_port",
                self.server_port.to_string(),
                "Local JSON API port",
            ),
            (
                "system_patterns",
                self.system_patterns.join(","),
                "Comma-separated program name fragments treated as OS services",
            ),
        ]
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    match value {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %v, "Unparseable config value, using default");
            default
        }),
        None => default,
    }
}

fn clamp_lookback(days: u32) -> u32 {
    if days > MAX_LOOKBACK_DAYS {
        tracing::warn!(days, max = MAX_LOOKBACK_DAYS, "lookback_days too large, clamping");
    }
    days.min(MAX_LOOKBACK_DAYS)
}

fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
