//! Source collectors.
//!
//! Each collector pulls raw items from an [`ArtifactProvider`], runs the
//! matching decoder over every item, tags the survivors with their
//! [`Source`] and sorts them newest first. A provider failure turns into an
//! empty list plus a [`SourceStatus`] explaining why; nothing here returns
//! an error to the caller.

pub mod events;

pub use events::*;

use crate::artifacts::{
    decode_counter_blob, decode_exec_history_name, decode_recent_path_entry, decode_run_mru,
    is_program_path, last_path_segment,
};
use crate::codec::rot13;
use crate::error::{ExecTrailError, Result};
use crate::store::{
    filter_by_date_in, merge, sort_by_last_run_desc, DailyUsage, ExecutionRecord, ReconciledView,
    SessionEvent, Source,
};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// A candidate Prefetch file with its filesystem times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchFile {
    pub filename: String,
    pub mtime: Option<DateTime<Utc>>,
    pub ctime: Option<DateTime<Utc>>,
}

/// Payload of a registry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    Binary(Vec<u8>),
    Text(String),
    /// Any other value type (DWORD, multi-string, ...).
    Other,
}

/// One enumerated registry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValue {
    pub name: String,
    pub data: RegistryData,
}

impl RegistryValue {
    pub fn binary(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: RegistryData::Binary(bytes),
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RegistryData::Text(text.into()),
        }
    }
}

/// Read-only access to the raw artifacts.
///
/// Implementations do the registry/filesystem work and report a missing or
/// inaccessible source as an error; collectors turn that into an empty list.
pub trait ArtifactProvider {
    /// Candidate files from the Prefetch folder.
    fn prefetch_files(&self) -> Result<Vec<PrefetchFile>>;

    /// Values of the UserAssist `Count` keys (names still rot13-encoded).
    fn userassist_values(&self) -> Result<Vec<RegistryValue>>;

    /// Values of every per-user BAM key.
    fn bam_values(&self) -> Result<Vec<RegistryValue>>;

    /// Values of the Run dialog MRU key.
    fn run_mru_values(&self) -> Result<Vec<RegistryValue>>;
}

/// Diagnostics for one source in a collection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub source: Source,
    /// Records kept after decoding.
    pub records: usize,
    /// Items that failed to decode and were dropped.
    pub malformed: usize,
    /// Why the whole source contributed nothing, if it was unreachable.
    pub unavailable: Option<String>,
}

/// Records plus diagnostics from a single collector.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub records: Vec<ExecutionRecord>,
    pub status: SourceStatus,
}

/// Per-item decode outcome.
enum Decoded {
    Record(ExecutionRecord),
    /// Item is not meant for this source (ordering values, zero counts, ...).
    Skipped,
    Malformed(&'static str),
}

fn fold_items<T>(
    source: Source,
    items: Result<Vec<T>>,
    decode: impl Fn(&T) -> Decoded,
) -> SourceOutcome {
    let items = match items {
        Ok(items) => items,
        Err(e) => {
            if e.is_partial() {
                tracing::warn!(%source, error = %e, "Source unavailable, continuing without it");
            } else {
                tracing::error!(%source, error = %e, "Source failed, continuing without it");
            }
            return SourceOutcome {
                records: Vec::new(),
                status: SourceStatus {
                    source,
                    records: 0,
                    malformed: 0,
                    unavailable: Some(e.to_string()),
                },
            };
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut malformed = 0usize;

    for item in &items {
        match decode(item) {
            Decoded::Record(record) => records.push(record),
            Decoded::Skipped => {}
            Decoded::Malformed(reason) => {
                malformed += 1;
                let err = ExecTrailError::RecordMalformed {
                    artifact: source,
                    reason: reason.to_string(),
                };
                tracing::trace!(error = %err, "Dropping record");
            }
        }
    }

    sort_by_last_run_desc(&mut records);

    tracing::info!(%source, count = records.len(), malformed, "Collected records");

    SourceOutcome {
        status: SourceStatus {
            source,
            records: records.len(),
            malformed,
            unavailable: None,
        },
        records,
    }
}

/// Collects Prefetch records.
pub fn collect_prefetch(provider: &dyn ArtifactProvider) -> SourceOutcome {
    fold_items(Source::Prefetch, provider.prefetch_files(), |file| {
        match decode_exec_history_name(&file.filename, file.mtime, file.ctime) {
            Some(decoded) => Decoded::Record(ExecutionRecord {
                full_path: Some(file.filename.clone()),
                last_run: decoded.last_run,
                first_run: decoded.first_run,
                ..ExecutionRecord::new(decoded.program, Source::Prefetch)
            }),
            None => Decoded::Malformed("not a Prefetch filename"),
        }
    })
}

/// Collects UserAssist records. Entries that never ran are skipped.
pub fn collect_userassist(provider: &dyn ArtifactProvider) -> SourceOutcome {
    fold_items(Source::UserAssist, provider.userassist_values(), |value| {
        let RegistryData::Binary(bytes) = &value.data else {
            return Decoded::Malformed("value is not binary");
        };
        let Some(blob) = decode_counter_blob(bytes) else {
            return Decoded::Malformed("counter blob too short");
        };
        if blob.run_count == 0 {
            return Decoded::Skipped;
        }

        let decoded_name = rot13(&value.name);
        Decoded::Record(ExecutionRecord {
            program: last_path_segment(&decoded_name).to_string(),
            full_path: Some(decoded_name.clone()),
            last_run: blob.last_run,
            first_run: None,
            run_count: Some(blob.run_count),
            source: Source::UserAssist,
        })
    })
}

/// Collects BAM records. Entries without a timestamp are dropped.
pub fn collect_bam(provider: &dyn ArtifactProvider) -> SourceOutcome {
    fold_items(Source::Bam, provider.bam_values(), |value| {
        if !is_program_path(&value.name) {
            return Decoded::Skipped;
        }
        let RegistryData::Binary(bytes) = &value.data else {
            return Decoded::Malformed("value is not binary");
        };
        match decode_recent_path_entry(&value.name, bytes) {
            Some(entry) => Decoded::Record(ExecutionRecord {
                full_path: Some(entry.full_path),
                last_run: Some(entry.last_run),
                ..ExecutionRecord::new(entry.program, Source::Bam)
            }),
            None => Decoded::Malformed("no usable timestamp"),
        }
    })
}

/// Collects Run dialog commands.
pub fn collect_run_history(provider: &dyn ArtifactProvider) -> SourceOutcome {
    fold_items(Source::RunHistory, provider.run_mru_values(), |value| {
        let RegistryData::Text(text) = &value.data else {
            return Decoded::Skipped;
        };
        match decode_run_mru(&value.name, text) {
            Some(command) => Decoded::Record(ExecutionRecord::new(command, Source::RunHistory)),
            None => Decoded::Skipped,
        }
    })
}

/// The four per-source lists from one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionHistory {
    pub prefetch: Vec<ExecutionRecord>,
    pub userassist: Vec<ExecutionRecord>,
    pub bam: Vec<ExecutionRecord>,
    pub run_history: Vec<ExecutionRecord>,
}

impl ExecutionHistory {
    /// Source lists in dedup priority order, command history last.
    pub fn sources(&self) -> Vec<(Source, &[ExecutionRecord])> {
        vec![
            (Source::Bam, self.bam.as_slice()),
            (Source::UserAssist, self.userassist.as_slice()),
            (Source::Prefetch, self.prefetch.as_slice()),
            (Source::RunHistory, self.run_history.as_slice()),
        ]
    }

    /// Deduplicated, time-ordered view across all sources.
    pub fn reconciled(&self) -> ReconciledView {
        merge(&self.sources())
    }

    /// Restricts the timestamped sources to one local calendar date.
    ///
    /// Command history has no timestamps and is passed through as is.
    pub fn for_date(&self, date: NaiveDate) -> Self {
        self.for_date_in(date, &Local)
    }

    /// Same as [`for_date`](Self::for_date) with an explicit time zone.
    pub fn for_date_in<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Self {
        Self {
            prefetch: filter_by_date_in(&self.prefetch, date, tz),
            userassist: filter_by_date_in(&self.userassist, date, tz),
            bam: filter_by_date_in(&self.bam, date, tz),
            run_history: self.run_history.clone(),
        }
    }
}

/// Everything gathered in one collection pass.
#[derive(Debug, Clone)]
pub struct CollectionPass {
    pub collected_at: DateTime<Utc>,
    pub history: ExecutionHistory,
    pub statuses: Vec<SourceStatus>,
    /// Session boundaries in ascending time order.
    pub session_events: Vec<SessionEvent>,
    /// Why the event log contributed nothing, if it was unreachable.
    pub event_log_unavailable: Option<String>,
    pub daily_usage: DailyUsage,
}

impl CollectionPass {
    /// Number of sources that could not be reached.
    pub fn unavailable_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| s.unavailable.is_some())
            .count()
            + usize::from(self.event_log_unavailable.is_some())
    }
}

/// Runs every collector once.
///
/// Always returns a pass; unreachable sources just contribute nothing.
pub fn run_collection(
    artifacts: &dyn ArtifactProvider,
    events: &dyn SessionEventProvider,
    lookback_days: u32,
) -> CollectionPass {
    let prefetch = collect_prefetch(artifacts);
    let userassist = collect_userassist(artifacts);
    let bam = collect_bam(artifacts);
    let run_history = collect_run_history(artifacts);

    let sessions = collect_session_events(events, lookback_days);

    let statuses = vec![
        prefetch.status,
        userassist.status,
        bam.status,
        run_history.status,
    ];

    CollectionPass {
        collected_at: Utc::now(),
        history: ExecutionHistory {
            prefetch: prefetch.records,
            userassist: userassist.records,
            bam: bam.records,
            run_history: run_history.records,
        },
        statuses,
        daily_usage: sessions.daily_usage,
        session_events: sessions.events,
        event_log_unavailable: sessions.unavailable,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::artifacts::userassist::tests::blob;
    use crate::codec::{EPOCH_OFFSET_SECS, TICKS_PER_SEC};
    use chrono::TimeZone;

    pub(crate) fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn bam_value(path: &str, t: DateTime<Utc>) -> RegistryValue {
        let ticks = (t.timestamp() + EPOCH_OFFSET_SECS) as u64 * TICKS_PER_SEC;
        let mut bytes = ticks.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        RegistryValue::binary(path, bytes)
    }

    /// Canned artifacts; `None` marks a source as unreachable.
    #[derive(Default)]
    pub(crate) struct FixtureArtifacts {
        pub prefetch: Option<Vec<PrefetchFile>>,
        pub userassist: Option<Vec<RegistryValue>>,
        pub bam: Option<Vec<RegistryValue>>,
        pub run_mru: Option<Vec<RegistryValue>>,
    }

    fn or_unavailable<T: Clone>(items: &Option<Vec<T>>, source: Source) -> Result<Vec<T>> {
        items
            .clone()
            .ok_or_else(|| ExecTrailError::unavailable(source, "access denied"))
    }

    impl ArtifactProvider for FixtureArtifacts {
        fn prefetch_files(&self) -> Result<Vec<PrefetchFile>> {
            or_unavailable(&self.prefetch, Source::Prefetch)
        }

        fn userassist_values(&self) -> Result<Vec<RegistryValue>> {
            or_unavailable(&self.userassist, Source::UserAssist)
        }

        fn bam_values(&self) -> Result<Vec<RegistryValue>> {
            or_unavailable(&self.bam, Source::Bam)
        }

        fn run_mru_values(&self) -> Result<Vec<RegistryValue>> {
            or_unavailable(&self.run_mru, Source::RunHistory)
        }
    }

    pub(crate) fn sample_artifacts() -> FixtureArtifacts {
        FixtureArtifacts {
            prefetch: Some(vec![
                PrefetchFile {
                    filename: "NOTEPAD.EXE-D8414F97.pf".to_string(),
                    mtime: Some(at(7, 10)),
                    ctime: Some(at(1, 8)),
                },
                PrefetchFile {
                    filename: "CHROME.EXE-A1B2C3D4.pf".to_string(),
                    mtime: Some(at(8, 9)),
                    ctime: None,
                },
                PrefetchFile {
                    filename: "Layout.ini".to_string(),
                    mtime: None,
                    ctime: None,
                },
            ]),
            userassist: Some(vec![
                // C:\Program Files\Game\game.exe
                RegistryValue::binary("P:\\Cebtenz Svyrf\\Tnzr\\tnzr.rkr", blob(4, Some(at(8, 20)))),
                // chrome.exe, older than the BAM entry
                RegistryValue::binary("{6D809377}\\Tbbtyr\\Puebzr\\puebzr.rkr", blob(12, Some(at(6, 12)))),
                RegistryValue::binary("HRZR_PGYFRFFVBA", blob(0, None)),
                RegistryValue::binary("gbb.fubeg", vec![0u8; 8]),
            ]),
            bam: Some(vec![
                bam_value(
                    "\\Device\\HarddiskVolume3\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
                    at(8, 18),
                ),
                RegistryValue::binary("Version", vec![1, 0, 0, 0]),
                RegistryValue::binary("\\Device\\HarddiskVolume3\\Windows\\broken.exe", vec![0u8; 3]),
            ]),
            run_mru: Some(vec![
                RegistryValue::text("a", "cmd\\1"),
                RegistryValue::text("b", "regedit\\1"),
                RegistryValue::text("MRUList", "ba"),
            ]),
        }
    }

    #[test]
    fn test_collect_prefetch() {
        let outcome = collect_prefetch(&sample_artifacts());

        let programs: Vec<_> = outcome.records.iter().map(|r| r.program.as_str()).collect();
        assert_eq!(programs, ["CHROME.EXE", "NOTEPAD.EXE"]);
        assert_eq!(outcome.records[1].first_run, Some(at(1, 8)));
        assert_eq!(outcome.status.malformed, 1);
        assert!(outcome.records.iter().all(|r| r.source == Source::Prefetch));
    }

    #[test]
    fn test_collect_userassist() {
        let outcome = collect_userassist(&sample_artifacts());

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].program, "game.exe");
        assert_eq!(
            outcome.records[0].full_path.as_deref(),
            Some("C:\\Program Files\\Game\\game.exe")
        );
        assert_eq!(outcome.records[0].run_count, Some(4));
        assert_eq!(outcome.records[1].program, "chrome.exe");
        // zero-count session entry is skipped, the 8-byte blob is malformed
        assert_eq!(outcome.status.malformed, 1);
    }

    #[test]
    fn test_collect_bam() {
        let outcome = collect_bam(&sample_artifacts());

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].program, "chrome.exe");
        assert_eq!(outcome.records[0].last_run, Some(at(8, 18)));
        assert_eq!(outcome.status.malformed, 1);
    }

    #[test]
    fn test_collect_run_history() {
        let outcome = collect_run_history(&sample_artifacts());

        let commands: Vec<_> = outcome.records.iter().map(|r| r.program.as_str()).collect();
        assert_eq!(commands, ["cmd", "regedit"]);
        assert_eq!(outcome.status.malformed, 0);
    }

    #[test]
    fn test_unavailable_source_is_empty_not_error() {
        let artifacts = FixtureArtifacts::default();

        let outcome = collect_prefetch(&artifacts);

        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.status.unavailable.as_deref(),
            Some("Prefetch unavailable: access denied")
        );
    }

    struct BrokenDisk;

    impl ArtifactProvider for BrokenDisk {
        fn prefetch_files(&self) -> Result<Vec<PrefetchFile>> {
            Err(std::io::Error::other("device not ready").into())
        }

        fn userassist_values(&self) -> Result<Vec<RegistryValue>> {
            Ok(Vec::new())
        }

        fn bam_values(&self) -> Result<Vec<RegistryValue>> {
            Ok(Vec::new())
        }

        fn run_mru_values(&self) -> Result<Vec<RegistryValue>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_hard_failure_is_still_contained() {
        let outcome = collect_prefetch(&BrokenDisk);

        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.status.unavailable.as_deref(),
            Some("IO failure: device not ready")
        );
    }

    #[test]
    fn test_timestampless_records_sorted_last() {
        let artifacts = FixtureArtifacts {
            userassist: Some(vec![
                RegistryValue::binary("abgrcnq.rkr", blob(1, None)),
                RegistryValue::binary("pnyp.rkr", blob(1, Some(at(8, 8)))),
            ]),
            ..Default::default()
        };

        let outcome = collect_userassist(&artifacts);

        assert_eq!(outcome.records[0].program, "calc.exe");
        assert_eq!(outcome.records[1].program, "notepad.exe");
        assert_eq!(outcome.records[1].last_run, None);
    }

    #[test]
    fn test_reconciled_history() {
        let a = sample_artifacts();
        let history = ExecutionHistory {
            prefetch: collect_prefetch(&a).records,
            userassist: collect_userassist(&a).records,
            bam: collect_bam(&a).records,
            run_history: collect_run_history(&a).records,
        };

        let view = history.reconciled();

        let programs: Vec<_> = view.programs.iter().map(|r| r.program.as_str()).collect();
        // chrome.exe from BAM wins over UserAssist and Prefetch (CHROME.EXE)
        assert_eq!(programs, ["game.exe", "chrome.exe", "NOTEPAD.EXE"]);
        assert_eq!(view.programs[1].source, Source::Bam);
        assert_eq!(view.run_history.len(), 2);
    }

    #[test]
    fn test_history_for_date() {
        let a = sample_artifacts();
        let history = ExecutionHistory {
            prefetch: collect_prefetch(&a).records,
            userassist: collect_userassist(&a).records,
            bam: collect_bam(&a).records,
            run_history: collect_run_history(&a).records,
        };

        let day = history.for_date_in(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(), &Utc);

        assert_eq!(day.prefetch.len(), 1);
        assert_eq!(day.userassist.len(), 1);
        assert_eq!(day.bam.len(), 1);
        assert_eq!(day.run_history.len(), 2);
    }

    #[test]
    fn test_run_collection_counts_unavailable() {
        let artifacts = FixtureArtifacts {
            bam: None,
            ..sample_artifacts()
        };
        let events = FixtureEvents(None);

        let pass = run_collection(&artifacts, &events, 7);

        assert!(pass.history.bam.is_empty());
        assert_eq!(pass.history.prefetch.len(), 2);
        assert_eq!(pass.unavailable_count(), 2);
        assert!(pass.daily_usage.is_empty());
    }

    pub(crate) struct FixtureEvents(pub Option<Vec<SessionEvent>>);

    impl SessionEventProvider for FixtureEvents {
        fn session_events(&self, _lookback_days: u32) -> Result<Vec<SessionEvent>> {
            self.0
                .clone()
                .ok_or_else(|| ExecTrailError::ClockAnomaly {
                    details: "event log query timed out".to_string(),
                })
        }
    }
}
