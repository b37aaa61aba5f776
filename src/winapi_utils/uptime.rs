//! System boot time and uptime.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// How long the machine has been up, and since when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemUptime {
    pub boot_time: DateTime<Utc>,
    pub uptime_secs: u64,
}

impl SystemUptime {
    /// Derives the boot time from an uptime observed at `now`.
    pub fn observed_at(now: DateTime<Utc>, uptime: Duration) -> Self {
        let boot_time = chrono::Duration::from_std(uptime)
            .ok()
            .and_then(|up| now.checked_sub_signed(up))
            .unwrap_or(now);

        Self {
            boot_time,
            uptime_secs: uptime.as_secs(),
        }
    }
}

/// Time since boot, from `GetTickCount64`.
#[cfg(windows)]
pub fn system_uptime() -> Result<Duration> {
    use windows::Win32::System::SystemInformation::GetTickCount64;

    let millis = unsafe { GetTickCount64() };
    Ok(Duration::from_millis(millis))
}

#[cfg(not(windows))]
pub fn system_uptime() -> Result<Duration> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "uptime is only available on Windows",
    )
    .into())
}

/// Boot time and uptime of the running system.
pub fn current_uptime() -> Result<SystemUptime> {
    Ok(SystemUptime::observed_at(Utc::now(), system_uptime()?))
}
