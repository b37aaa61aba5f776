//! Cross-source reconciliation and record filters.
//!
//! Merging picks one record per program using a fixed authority ranking
//! (BAM, then UserAssist, then Prefetch). Fields are never combined across
//! sources: the most authoritative record is kept whole.

use super::types::{sort_by_last_run_desc, ExecutionRecord, ReconciledView, Source};
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::HashSet;

/// OS service name fragments excluded by [`filter_user_programs`].
pub const DEFAULT_SYSTEM_PATTERNS: [&str; 19] = [
    "DLLHOST",
    "SVCHOST",
    "CSRSS",
    "CONHOST",
    "TASKHOST",
    "WUDFHOST",
    "SIHOST",
    "CTFMON",
    "DWMEXE",
    "FONTDRVHOST",
    "SEARCHPROTOCOLHOST",
    "SEARCHFILTERHOST",
    "SEARCHINDEXER",
    "WMIPRVSE",
    "RUNTIMEBROKER",
    "SHELLEXPERIENCEHOST",
    "APPLICATIONFRAMEHOST",
    "SYSTEMSETTINGS",
    "LOCKAPP",
];

/// Merges per-source lists into one deduplicated view.
///
/// Lists are visited in priority order regardless of the order they are
/// passed in; within a list the existing order decides which duplicate is
/// kept. Run history is concatenated into its own list untouched.
pub fn merge(sources: &[(Source, &[ExecutionRecord])]) -> ReconciledView {
    let mut seen: HashSet<String> = HashSet::new();
    let mut programs = Vec::new();

    // Stable sort: lists of the same source keep their relative order
    let mut ranked: Vec<(usize, &[ExecutionRecord])> = sources
        .iter()
        .filter_map(|(source, records)| source.priority().map(|rank| (rank, *records)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);

    for (_, records) in ranked {
        for record in records {
            let key = record.dedup_key();
            if key.is_empty() {
                continue;
            }
            if seen.insert(key) {
                programs.push(record.clone());
            }
        }
    }

    sort_by_last_run_desc(&mut programs);

    let run_history = sources
        .iter()
        .filter(|(s, _)| *s == Source::RunHistory)
        .flat_map(|(_, records)| records.iter().cloned())
        .collect();

    ReconciledView {
        programs,
        run_history,
    }
}

/// Keeps records whose `last_run` falls on `date` in local time.
pub fn filter_by_date(records: &[ExecutionRecord], date: NaiveDate) -> Vec<ExecutionRecord> {
    filter_by_date_in(records, date, &Local)
}

/// Keeps records whose `last_run` falls on `date` in `tz`.
///
/// Records without a timestamp never match.
pub fn filter_by_date_in<Tz: TimeZone>(
    records: &[ExecutionRecord],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<ExecutionRecord> {
    records
        .iter()
        .filter(|r| {
            r.last_run
                .is_some_and(|t| t.with_timezone(tz).date_naive() == date)
        })
        .cloned()
        .collect()
}

/// Drops records whose program name contains any of `patterns`.
///
/// Matching is case-insensitive. Anything not on the list passes.
pub fn filter_user_programs<S: AsRef<str>>(
    records: &[ExecutionRecord],
    patterns: &[S],
) -> Vec<ExecutionRecord> {
    let patterns: Vec<String> = patterns
        .iter()
        .map(|p| p.as_ref().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();

    records
        .iter()
        .filter(|r| {
            let program = r.program.to_lowercase();
            !patterns.iter().any(|p| program.contains(p.as_str()))
        })
        .cloned()
        .collect()
}
