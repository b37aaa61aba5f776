//! Session events from the Windows event log.
//!
//! Queries Winlogon logon/logoff (7001/7002) and Kernel-General boot and
//! shutdown (12/13) events through PowerShell, bounded by a timeout.

use crate::collect::{parse_event_log_json, SessionEventProvider};
use crate::error::{ExecTrailError, Result};
use crate::store::SessionEvent;
use chrono::{DateTime, Days, Local, Utc};
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Event log collaborator backed by `Get-WinEvent`.
#[derive(Debug, Clone)]
pub struct EventLogQuery {
    pub timeout: Duration,
}

impl EventLogQuery {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SessionEventProvider for EventLogQuery {
    fn session_events(&self, lookback_days: u32) -> Result<Vec<SessionEvent>> {
        if !cfg!(windows) {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "event log is only available on Windows",
            )
            .into());
        }

        let mut command = Command::new("powershell");
        command.args(["-NoProfile", "-Command", &query_script(lookback_days)]);

        let output = run_with_timeout(command, self.timeout)?;
        parse_event_log_json(&output, &Local)
    }
}

fn query_script(lookback_days: u32) -> String {
    let start = Local::now()
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or_else(|| {
            tracing::warn!(lookback_days, "Lookback out of range, querying from the Unix epoch");
            DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local)
        })
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();

    format!(
        r#"
        $events = @()
        $filters = @(
            @{{ LogName = 'System'; ProviderName = 'Microsoft-Windows-Winlogon'; Id = 7001, 7002; StartTime = '{start}' }},
            @{{ LogName = 'System'; ProviderName = 'Microsoft-Windows-Kernel-General'; Id = 12, 13; StartTime = '{start}' }}
        )
        foreach ($f in $filters) {{
            try {{
                foreach ($e in (Get-WinEvent -FilterHashtable $f -ErrorAction SilentlyContinue)) {{
                    $events += [PSCustomObject]@{{
                        Time = $e.TimeCreated.ToString('yyyy-MM-dd HH:mm:ss')
                        EventId = $e.Id
                    }}
                }}
            }} catch {{}}
        }}
        $events | Sort-Object Time | ConvertTo-Json
        "#
    )
}

/// Runs `command` and returns its stdout, killing it after `timeout`.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdout not captured"))?;

    // Drain stdout concurrently so a chatty child cannot block on a full pipe
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = stdout.read_to_end(&mut buf) {
            tracing::debug!(error = %e, read = buf.len(), "Child stdout read ended early");
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(timeout_secs = timeout.as_secs(), "Event log query timed out");
            return Err(ExecTrailError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "event log query timed out",
            )));
        }
        thread::sleep(Duration::from_millis(50));
    }

    let bytes = reader.join().unwrap_or_default();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
