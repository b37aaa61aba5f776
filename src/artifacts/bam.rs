//! Background Activity Moderator value decoder.
//!
//! BAM keeps one value per executable path under each user SID; the data
//! starts with a 1601-epoch tick count of the last execution.

use super::last_path_segment;
use crate::codec::{ticks_to_time, ByteCursor};
use chrono::{DateTime, Utc};

/// Extensions that mark a value name as a launched program.
pub const EXECUTABLE_EXTENSIONS: [&str; 2] = [".exe", ".lnk"];

/// A program path with its last execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentPathEntry {
    /// Last path segment, e.g. "chrome.exe".
    pub program: String,
    /// Value name as stored.
    pub full_path: String,
    pub last_run: DateTime<Utc>,
}

/// Whether a value name looks like a path to an executable or shortcut.
pub fn is_program_path(name: &str) -> bool {
    if !name.contains('\\') {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    EXECUTABLE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Decodes one BAM value.
///
/// Non-program names (`Version`, `SequenceNumber`, ...) and entries without
/// a usable timestamp are dropped.
pub fn decode_recent_path_entry(name: &str, value: &[u8]) -> Option<RecentPathEntry> {
    if !is_program_path(name) {
        return None;
    }

    let last_run = ByteCursor::new(value).u64_le_at(0).and_then(ticks_to_time)?;

    Some(RecentPathEntry {
        program: last_path_segment(name).to_string(),
        full_path: name.to_string(),
        last_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EPOCH_OFFSET_SECS, TICKS_PER_SEC};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn value_for(t: DateTime<Utc>) -> Vec<u8> {
        let ticks = (t.timestamp() + EPOCH_OFFSET_SECS) as u64 * TICKS_PER_SEC;
        let mut bytes = ticks.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn test_decodes_program_path() {
        let t = Utc.with_ymd_and_hms(2024, 1, 8, 20, 0, 0).unwrap();
        let name = "\\Device\\HarddiskVolume3\\Program Files\\Google\\Chrome\\chrome.exe";

        let entry = decode_recent_path_entry(name, &value_for(t)).unwrap();

        assert_eq!(entry.program, "chrome.exe");
        assert_eq!(entry.full_path, name);
        assert_eq!(entry.last_run, t);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(is_program_path("\\Device\\HarddiskVolume3\\Windows\\EXPLORER.EXE"));
        assert!(is_program_path("C:\\Users\\me\\Desktop\\Game.LNK"));
    }

    #[test]
    fn test_rejects_non_paths() {
        assert!(!is_program_path("Version"));
        assert!(!is_program_path("SequenceNumber"));
        assert!(!is_program_path("Microsoft.WindowsCalculator_8wekyb3d8bbwe"));
        assert!(!is_program_path("C:\\Windows\\system32\\kernel32.dll"));
        assert!(!is_program_path("notepad.exe"));
    }

    #[test]
    fn test_missing_timestamp_discards_entry() {
        let name = "\\Device\\HarddiskVolume3\\Windows\\notepad.exe";
        assert!(decode_recent_path_entry(name, &[0u8; 4]).is_none());
        assert!(decode_recent_path_entry(name, &[0u8; 24]).is_none());
    }

    proptest! {
        #[test]
        fn never_panics(name in "\\PC*", value in proptest::collection::vec(any::<u8>(), 0..32)) {
            if let Some(entry) = decode_recent_path_entry(&name, &value) {
                prop_assert!(is_program_path(&name));
                prop_assert!(value.len() >= 8);
                prop_assert_eq!(entry.full_path, name);
            }
        }

        #[test]
        fn program_paths_need_eight_bytes(
            name in "[A-Za-z0-9 ]{0,8}(\\\\[A-Za-z0-9 .]{0,8}){1,3}\\.(exe|lnk|EXE|Lnk)",
            value in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            prop_assert!(is_program_path(&name));
            if value.len() < 8 {
                prop_assert!(decode_recent_path_entry(&name, &value).is_none());
            }
        }
    }
}
