//! UserAssist counter blob decoder.
//!
//! Layout (Windows 7+): run count as `u32` at offset 4, last execution as a
//! 1601-epoch tick count at offset 60. Older or truncated blobs may stop
//! before the timestamp.

use crate::codec::{ticks_to_time, ByteCursor};
use chrono::{DateTime, Utc};

const MIN_LEN: usize = 16;
const RUN_COUNT_OFFSET: usize = 4;
const LAST_RUN_OFFSET: usize = 60;
const LAST_RUN_END: usize = LAST_RUN_OFFSET + 8;

/// Fields recovered from a UserAssist value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterBlob {
    pub run_count: u32,
    pub last_run: Option<DateTime<Utc>>,
}

/// Decodes a UserAssist counter blob. `None` for blobs under 16 bytes.
pub fn decode_counter_blob(bytes: &[u8]) -> Option<CounterBlob> {
    let cursor = ByteCursor::new(bytes);
    if !cursor.has(MIN_LEN) {
        return None;
    }

    let run_count = cursor.u32_le_at(RUN_COUNT_OFFSET)?;
    let last_run = if cursor.has(LAST_RUN_END) {
        cursor.u64_le_at(LAST_RUN_OFFSET).and_then(ticks_to_time)
    } else {
        None
    };

    Some(CounterBlob {
        run_count,
        last_run,
    })
}
