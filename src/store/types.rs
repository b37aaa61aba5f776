//! Data types for execution history and usage tracking.
//!
//! Defines the normalized execution record shared by every artifact
//! source, session boundary events, per-day usage totals, and the daily
//! snapshot shape that gets persisted between runs.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Artifact family an execution record was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Filename convention of the Prefetch folder.
    Prefetch,
    /// Rot13-named counter blobs under the Explorer UserAssist key.
    UserAssist,
    /// Background Activity Moderator per-user value blobs.
    #[serde(rename = "BAM")]
    Bam,
    /// Commands typed into the Run dialog.
    RunHistory,
}

impl Source {
    /// Sources that take part in identity dedup, most authoritative first.
    pub const PRIORITY_ORDER: [Source; 3] = [Source::Bam, Source::UserAssist, Source::Prefetch];

    /// Dedup rank (lower wins). `None` for sources kept out of identity dedup.
    pub fn priority(self) -> Option<usize> {
        Self::PRIORITY_ORDER.iter().position(|s| *s == self)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Prefetch => "Prefetch",
            Source::UserAssist => "UserAssist",
            Source::Bam => "BAM",
            Source::RunHistory => "RunHistory",
        };
        f.write_str(name)
    }
}

/// One observed execution of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Display identifier, kept verbatim (e.g. "CHROME.EXE").
    pub program: String,

    /// Best-known full path, or the raw key/file name.
    pub full_path: Option<String>,

    /// Last time the program ran. `None` when the artifact has no timestamp.
    pub last_run: Option<DateTime<Utc>>,

    /// First time the program ran, when the artifact exposes it.
    #[serde(default)]
    pub first_run: Option<DateTime<Utc>>,

    /// Run counter, only carried by some sources.
    pub run_count: Option<u32>,

    /// Where this record came from.
    pub source: Source,
}

impl ExecutionRecord {
    /// Creates a bare record with only a program name.
    pub fn new(program: impl Into<String>, source: Source) -> Self {
        Self {
            program: program.into(),
            full_path: None,
            last_run: None,
            first_run: None,
            run_count: None,
            source,
        }
    }

    /// Case-folded identity used for cross-source dedup.
    pub fn dedup_key(&self) -> String {
        self.program.to_lowercase()
    }
}

/// Sorts records by `last_run` descending, timestamp-less records last.
///
/// Stable: records with equal timestamps keep their relative order.
pub fn sort_by_last_run_desc(records: &mut [ExecutionRecord]) {
    // Option orders None below Some, so a reversed comparison sinks them
    records.sort_by(|a, b| b.last_run.cmp(&a.last_run));
}

/// Whether an event opens or closes an active-use interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    SessionStart,
    SessionEnd,
}

impl SessionKind {
    /// Maps an event-log id to a session boundary.
    ///
    /// Logon (7001) and boot (12) open a session; logoff (7002) and
    /// shutdown (13) close one. Anything else is not a boundary.
    pub fn from_event_id(event_id: u32) -> Option<Self> {
        match event_id {
            7001 | 12 => Some(SessionKind::SessionStart),
            7002 | 13 => Some(SessionKind::SessionEnd),
            _ => None,
        }
    }
}

/// A session boundary marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub time: DateTime<Utc>,
    pub kind: SessionKind,
}

impl SessionEvent {
    pub fn start(time: DateTime<Utc>) -> Self {
        Self {
            time,
            kind: SessionKind::SessionStart,
        }
    }

    pub fn end(time: DateTime<Utc>) -> Self {
        Self {
            time,
            kind: SessionKind::SessionEnd,
        }
    }
}

/// Active-use time accumulated per calendar date.
///
/// Only dates on which at least one start/end pair closed have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyUsage {
    totals: BTreeMap<NaiveDate, Duration>,
}

impl DailyUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-negative duration to `date`.
    pub(crate) fn accumulate(&mut self, date: NaiveDate, duration: Duration) {
        let entry = self.totals.entry(date).or_insert_with(Duration::zero);
        *entry += duration;
    }

    /// Total for `date`, if any session closed on it.
    pub fn get(&self, date: NaiveDate) -> Option<Duration> {
        self.totals.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Iterates dates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &Duration)> {
        self.totals.iter()
    }

    /// Seconds per `YYYY-MM-DD` key, the shape used for persistence and the API.
    pub fn to_secs_map(&self) -> BTreeMap<String, i64> {
        self.totals
            .iter()
            .map(|(date, d)| (date.format("%Y-%m-%d").to_string(), d.num_seconds()))
            .collect()
    }
}

/// Deduplicated execution list plus the separate command history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledView {
    /// One record per case-folded program, sorted by `last_run` descending.
    pub programs: Vec<ExecutionRecord>,

    /// Run-dialog commands, never deduplicated against `programs`.
    pub run_history: Vec<ExecutionRecord>,
}

// === Daily snapshots ===

/// One visited page, as produced by the browser history reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitRecord {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub last_visit: Option<String>,
}

/// One recently opened file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    pub name: String,
    pub path: Option<String>,
    pub category: Option<String>,
    pub accessed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentFiles {
    pub files: Vec<FileRecord>,
}

/// Play count for a single game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStat {
    pub game_name: String,
    pub play_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameHistory {
    pub game_stats: Vec<GameStat>,
}

/// Everything collected for one day, as persisted between runs.
///
/// Unknown or missing sections deserialize to empty values so older
/// snapshots keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailySnapshot {
    /// Date key (YYYY-MM-DD).
    pub date: String,
    pub saved_at: Option<String>,
    pub browser_history: Vec<VisitRecord>,
    pub recent_files: RecentFiles,
    pub roblox: GameHistory,
    pub programs: Vec<ExecutionRecord>,
    pub run_history: Vec<ExecutionRecord>,
    /// Active-use seconds per date.
    pub daily_usage: BTreeMap<String, i64>,
}
