//! Session boundary events from the system event log.
//!
//! The event log query itself lives with the platform collaborators; this
//! module parses its JSON output and folds the events into daily usage.

use crate::error::Result;
use crate::store::{aggregate_daily_usage_in, DailyUsage, SessionEvent, SessionKind};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Time format of the `Time` field in the event log query output.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of session start/end events.
///
/// Implementations bound their own wait and report a timeout as an error.
pub trait SessionEventProvider {
    /// Events from the last `lookback_days`, in any order.
    fn session_events(&self, lookback_days: u32) -> Result<Vec<SessionEvent>>;
}

/// One row of the event log query output.
#[derive(Debug, Deserialize)]
struct RawLogEvent {
    #[serde(rename = "Time", default)]
    time: String,
    #[serde(rename = "EventId", default)]
    event_id: u32,
}

/// The query prints a bare object when exactly one event matched.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLogOutput {
    Many(Vec<RawLogEvent>),
    One(RawLogEvent),
}

/// Parses event log query output, interpreting times in `tz`.
///
/// Events with an unknown id or unparseable time are skipped. The result
/// is sorted by time ascending. Blank output means no events.
pub fn parse_event_log_json<Tz: TimeZone>(json: &str, tz: &Tz) -> Result<Vec<SessionEvent>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw = match serde_json::from_str::<RawLogOutput>(json)? {
        RawLogOutput::Many(events) => events,
        RawLogOutput::One(event) => vec![event],
    };

    let mut events: Vec<SessionEvent> = raw
        .iter()
        .filter_map(|event| {
            let kind = SessionKind::from_event_id(event.event_id)?;
            let Some(time) = parse_local_time(&event.time, tz) else {
                tracing::debug!(time = %event.time, "Skipping event with unparseable time");
                return None;
            };
            Some(SessionEvent { time, kind })
        })
        .collect();

    events.sort_by_key(|e| e.time);
    Ok(events)
}

fn parse_local_time<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), EVENT_TIME_FORMAT).ok()?;
    // DST fold: take the earlier instant
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Session events and the usage derived from them.
#[derive(Debug, Clone, Default)]
pub struct SessionCollection {
    pub events: Vec<SessionEvent>,
    pub daily_usage: DailyUsage,
    pub unavailable: Option<String>,
}

/// Fetches session events and aggregates them by local date.
pub fn collect_session_events(
    provider: &dyn SessionEventProvider,
    lookback_days: u32,
) -> SessionCollection {
    collect_session_events_in(provider, lookback_days, &Local)
}

/// Same as [`collect_session_events`] with an explicit time zone.
pub fn collect_session_events_in<Tz: TimeZone>(
    provider: &dyn SessionEventProvider,
    lookback_days: u32,
    tz: &Tz,
) -> SessionCollection {
    match provider.session_events(lookback_days) {
        Ok(mut events) => {
            events.sort_by_key(|e| e.time);
            let daily_usage = aggregate_daily_usage_in(&events, tz);
            tracing::info!(
                events = events.len(),
                days = daily_usage.len(),
                "Collected session events"
            );
            SessionCollection {
                events,
                daily_usage,
                unavailable: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Event log unavailable, continuing without usage totals");
            SessionCollection {
                unavailable: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}
