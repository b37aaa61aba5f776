//! Prefetch filename decoder.
//!
//! Prefetch files are named `PROGRAM-XXXXXXXX.pf`, where the suffix after
//! the last `-` is a path hash. The program name itself may contain `-`.

use chrono::{DateTime, Utc};

const EXTENSION: &str = ".pf";

/// Program identity recovered from a Prefetch filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecHistoryName {
    /// Program identifier, hash suffix removed.
    pub program: String,
    /// Filesystem modify time of the artifact.
    pub last_run: Option<DateTime<Utc>>,
    /// Filesystem create time of the artifact.
    pub first_run: Option<DateTime<Utc>>,
}

/// Decodes a Prefetch filename.
///
/// Returns `None` when the name does not carry the `.pf` extension
/// (case-insensitive). Missing timestamps never abort decoding.
pub fn decode_exec_history_name(
    filename: &str,
    mtime: Option<DateTime<Utc>>,
    ctime: Option<DateTime<Utc>>,
) -> Option<ExecHistoryName> {
    let split = filename.len().checked_sub(EXTENSION.len())?;
    let (stem, ext) = (filename.get(..split)?, filename.get(split..)?);
    if !ext.eq_ignore_ascii_case(EXTENSION) {
        return None;
    }

    let program = match stem.rsplit_once('-') {
        Some((name, _hash)) => name,
        None => stem,
    };

    Some(ExecHistoryName {
        program: program.to_string(),
        last_run: mtime,
        first_run: ctime,
    })
}
