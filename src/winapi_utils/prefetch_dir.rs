//! Prefetch folder listing.
//!
//! Plain filesystem access, so it works anywhere a Prefetch folder (or a
//! copy of one) is mounted. Reading the live folder usually needs
//! administrator rights.

use crate::collect::PrefetchFile;
use crate::error::{ExecTrailError, Result};
use crate::store::Source;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// `%WINDIR%\Prefetch`, defaulting to `C:\Windows\Prefetch`.
pub fn default_prefetch_dir() -> PathBuf {
    let windows_dir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
    PathBuf::from(windows_dir).join("Prefetch")
}

/// Lists `*.pf` files in `dir` with their modify/create times.
///
/// Entries whose metadata cannot be read are still listed, just without
/// timestamps.
pub fn list_prefetch_files(dir: &Path) -> Result<Vec<PrefetchFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::NotFound => format!("folder not found: {}", dir.display()),
            ErrorKind::PermissionDenied => {
                "access denied (administrator rights required)".to_string()
            }
            _ => format!("cannot read {}: {e}", dir.display()),
        };
        ExecTrailError::unavailable(Source::Prefetch, reason)
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };

        let path = entry.path();
        let is_pf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pf"));
        if !is_pf {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata().ok();
        let mtime = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        let ctime = metadata
            .as_ref()
            .and_then(|m| m.created().ok())
            .map(DateTime::<Utc>::from);

        files.push(PrefetchFile {
            filename,
            mtime,
            ctime,
        });
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "Listed Prefetch folder");
    Ok(files)
}
