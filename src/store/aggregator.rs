//! Usage aggregation.
//!
//! Pairs session start/end events into per-day active time, and folds
//! persisted daily snapshots into period rankings.

use super::types::{DailySnapshot, DailyUsage, SessionEvent, SessionKind};
use crate::error::ExecTrailError;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Size of the ranked lists in a [`PeriodSummary`].
pub const TOP_K: usize = 10;

/// Accumulates per-day usage from events in local time.
pub fn aggregate_daily_usage(events: &[SessionEvent]) -> DailyUsage {
    aggregate_daily_usage_in(events, &Local)
}

/// Accumulates per-day usage, bucketing by the end event's date in `tz`.
///
/// Events are paired in time order. A start overwrites any start still
/// waiting for its end, an end with no start is ignored, and a trailing
/// start at the end of the stream earns nothing. A session that crosses
/// midnight counts entirely toward the day it ended.
pub fn aggregate_daily_usage_in<Tz: TimeZone>(events: &[SessionEvent], tz: &Tz) -> DailyUsage {
    let mut ordered = events.to_vec();
    ordered.sort_by_key(|e| e.time);

    let mut usage = DailyUsage::new();
    let mut last_start: Option<DateTime<Utc>> = None;

    for event in &ordered {
        match event.kind {
            SessionKind::SessionStart => {
                if let Some(dropped) = last_start {
                    tracing::trace!(%dropped, "Unmatched session start replaced");
                }
                last_start = Some(event.time);
            }
            SessionKind::SessionEnd => {
                let Some(start) = last_start.take() else {
                    tracing::trace!(time = %event.time, "Ignoring session end without start");
                    continue;
                };

                let duration = event.time - start;
                if duration < chrono::Duration::zero() {
                    let err = ExecTrailError::ClockAnomaly {
                        details: format!("session ends at {} before its start {start}", event.time),
                    };
                    tracing::debug!(error = %err, "Discarding session");
                    continue;
                }

                let date = event.time.with_timezone(tz).date_naive();
                usage.accumulate(date, duration);
            }
        }
    }

    usage
}

/// Keeps events whose time falls on `date` in `tz`.
pub fn filter_events_by_date<Tz: TimeZone>(
    events: &[SessionEvent],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<SessionEvent> {
    events
        .iter()
        .filter(|e| e.time.with_timezone(tz).date_naive() == date)
        .copied()
        .collect()
}

/// A key with its accumulated count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub name: String,
    pub count: u64,
}

/// Rolled-up view over several daily snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub period_days: u32,
    /// Number of snapshots folded in.
    pub data_count: usize,
    pub total_visits: u64,
    pub total_files: u64,
    pub top_domains: Vec<RankedCount>,
    pub top_games: Vec<RankedCount>,
    pub dates: Vec<String>,
}

/// Running totals that remember first-seen order for tie breaks.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<RankedCount>,
}

impl Tally {
    fn add(&mut self, name: &str, count: u64) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].count += count,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(RankedCount {
                    name: name.to_string(),
                    count,
                });
            }
        }
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn top(mut self, k: usize) -> Vec<RankedCount> {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(k);
        self.entries
    }
}

/// Folds daily snapshots into totals and top-10 rankings.
///
/// Domains are ranked by visit count, games by cumulative play count.
pub fn summarize(snapshots: &[DailySnapshot], window_days: u32) -> PeriodSummary {
    let mut total_visits = 0u64;
    let mut total_files = 0u64;
    let mut domains = Tally::default();
    let mut games = Tally::default();

    for snapshot in snapshots {
        total_visits += snapshot.browser_history.len() as u64;
        for visit in &snapshot.browser_history {
            domains.add(&visit.domain, 1);
        }

        total_files += snapshot.recent_files.files.len() as u64;

        for game in &snapshot.roblox.game_stats {
            games.add(&game.game_name, game.play_count);
        }
    }

    PeriodSummary {
        period_days: window_days,
        data_count: snapshots.len(),
        total_visits,
        total_files,
        top_domains: domains.top(TOP_K),
        top_games: games.top(TOP_K),
        dates: snapshots.iter().map(|s| s.date.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{FileRecord, GameStat, VisitRecord};
    use chrono::Duration;

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, min, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_single_session() {
        let events = [SessionEvent::start(at(8, 9, 0)), SessionEvent::end(at(8, 17, 0))];

        let usage = aggregate_daily_usage_in(&events, &Utc);

        assert_eq!(usage.get(date(8)), Some(Duration::hours(8)));
        assert_eq!(usage.len(), 1);
    }

    #[test]
    fn test_trailing_start_contributes_nothing() {
        let events = [
            SessionEvent::start(at(8, 9, 0)),
            SessionEvent::end(at(8, 10, 0)),
            SessionEvent::start(at(8, 11, 0)),
        ];

        let usage = aggregate_daily_usage_in(&events, &Utc);

        assert_eq!(usage.get(date(8)), Some(Duration::hours(1)));
    }

    #[test]
    fn test_unmatched_end_ignored() {
        let events = [
            SessionEvent::end(at(8, 8, 0)),
            SessionEvent::start(at(8, 9, 0)),
            SessionEvent::end(at(8, 9, 30)),
        ];

        let usage = aggregate_daily_usage_in(&events, &Utc);

        assert_eq!(usage.get(date(8)), Some(Duration::minutes(30)));
    }

    #[test]
    fn test_repeated_start_overwrites() {
        let events = [
            SessionEvent::start(at(8, 9, 0)),
            SessionEvent::start(at(8, 12, 0)),
            SessionEvent::end(at(8, 13, 0)),
        ];

        let usage = aggregate_daily_usage_in(&events, &Utc);

        assert_eq!(usage.get(date(8)), Some(Duration::hours(1)));
    }

    #[test]
    fn test_midnight_crossing_goes_to_end_date() {
        let events = [SessionEvent::start(at(7, 22, 0)), SessionEvent::end(at(8, 2, 0))];

        let usage = aggregate_daily_usage_in(&events, &Utc);

        assert_eq!(usage.get(date(7)), None);
        assert_eq!(usage.get(date(8)), Some(Duration::hours(4)));
    }

    #[test]
    fn test_unsorted_input_and_multiple_days() {
        let events = [
            SessionEvent::end(at(9, 18, 0)),
            SessionEvent::start(at(8, 9, 0)),
            SessionEvent::start(at(9, 10, 0)),
            SessionEvent::end(at(8, 12, 0)),
            SessionEvent::start(at(8, 13, 0)),
            SessionEvent::end(at(8, 14, 0)),
        ];

        let usage = aggregate_daily_usage_in(&events, &Utc);

        assert_eq!(usage.get(date(8)), Some(Duration::hours(4)));
        assert_eq!(usage.get(date(9)), Some(Duration::hours(8)));
    }

    #[test]
    fn test_empty_events() {
        assert!(aggregate_daily_usage_in(&[], &Utc).is_empty());
    }

    #[test]
    fn test_filter_events_by_date() {
        let events = [
            SessionEvent::start(at(7, 23, 0)),
            SessionEvent::end(at(8, 1, 0)),
        ];

        let day = filter_events_by_date(&events, date(8), &Utc);

        assert_eq!(day, vec![SessionEvent::end(at(8, 1, 0))]);
    }

    fn snapshot(date: &str, domains: &[&str], files: usize, games: &[(&str, u64)]) -> DailySnapshot {
        let mut s = DailySnapshot {
            date: date.to_string(),
            ..Default::default()
        };
        s.browser_history = domains
            .iter()
            .map(|d| VisitRecord {
                domain: d.to_string(),
                ..Default::default()
            })
            .collect();
        s.recent_files.files = vec![FileRecord::default(); files];
        s.roblox.game_stats = games
            .iter()
            .map(|(name, count)| GameStat {
                game_name: name.to_string(),
                play_count: *count,
            })
            .collect();
        s
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[], 7);

        assert_eq!(summary.total_visits, 0);
        assert_eq!(summary.total_files, 0);
        assert!(summary.top_domains.is_empty());
        assert!(summary.top_games.is_empty());
        assert!(summary.dates.is_empty());
        assert_eq!(summary.period_days, 7);
    }

    #[test]
    fn test_summarize_folds_days() {
        let snapshots = vec![
            snapshot("2024-01-07", &["b.com", "a.com", "a.com"], 2, &[("Doors", 2)]),
            snapshot("2024-01-08", &["b.com", "c.com"], 3, &[("Adopt Me!", 1), ("Doors", 3)]),
        ];

        let summary = summarize(&snapshots, 7);

        assert_eq!(summary.total_visits, 5);
        assert_eq!(summary.total_files, 5);
        assert_eq!(summary.data_count, 2);
        assert_eq!(summary.dates, ["2024-01-07", "2024-01-08"]);

        let domains: Vec<_> = summary
            .top_domains
            .iter()
            .map(|r| (r.name.as_str(), r.count))
            .collect();
        // b.com and a.com tie; b.com was seen first
        assert_eq!(domains, [("b.com", 2), ("a.com", 2), ("c.com", 1)]);

        assert_eq!(summary.top_games[0], RankedCount { name: "Doors".to_string(), count: 5 });
    }

    #[test]
    fn test_summarize_truncates_to_top_k() {
        let names: Vec<String> = (0..15).map(|i| format!("site{i}.com")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let summary = summarize(&[snapshot("2024-01-08", &refs, 0, &[])], 7);

        assert_eq!(summary.top_domains.len(), TOP_K);
        assert_eq!(summary.top_domains[0].name, "site0.com");
    }
}
