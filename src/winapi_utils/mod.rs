//! Access to the live system's execution artifacts.
//!
//! [`SystemArtifacts`] and [`EventLogQuery`] are the production
//! collaborators behind the collector seams; [`current_uptime`] feeds the
//! usage report. Registry and tick-count access is only compiled on
//! Windows; elsewhere those sources report themselves unavailable.

pub mod event_log;
pub mod prefetch_dir;
#[cfg(windows)]
pub mod registry;
pub mod uptime;

pub use event_log::*;
pub use prefetch_dir::*;
pub use uptime::*;

use crate::collect::{ArtifactProvider, PrefetchFile, RegistryValue};
use crate::error::Result;
use std::path::PathBuf;

#[cfg(not(windows))]
use crate::error::ExecTrailError;
#[cfg(not(windows))]
use crate::store::Source;

/// Artifact provider backed by the local filesystem and registry.
#[derive(Debug, Clone)]
pub struct SystemArtifacts {
    prefetch_dir: PathBuf,
}

impl Default for SystemArtifacts {
    fn default() -> Self {
        Self {
            prefetch_dir: default_prefetch_dir(),
        }
    }
}

impl SystemArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads Prefetch files from `dir` instead of the system folder.
    pub fn with_prefetch_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            prefetch_dir: dir.into(),
        }
    }
}

#[cfg(windows)]
impl ArtifactProvider for SystemArtifacts {
    fn prefetch_files(&self) -> Result<Vec<PrefetchFile>> {
        list_prefetch_files(&self.prefetch_dir)
    }

    fn userassist_values(&self) -> Result<Vec<RegistryValue>> {
        use crate::error::ExecTrailError;
        use crate::store::Source;
        use registry::{RegKey, HKEY_CURRENT_USER, USERASSIST_KEYS};

        let mut values = Vec::new();
        let mut opened = 0;
        for path in USERASSIST_KEYS {
            match RegKey::open(HKEY_CURRENT_USER, path) {
                Ok(key) => {
                    opened += 1;
                    values.extend(key.values());
                }
                Err(e) => tracing::debug!(path, error = %e, "UserAssist key not readable"),
            }
        }

        if opened == 0 {
            return Err(ExecTrailError::unavailable(
                Source::UserAssist,
                "no UserAssist key could be opened",
            ));
        }
        Ok(values)
    }

    fn bam_values(&self) -> Result<Vec<RegistryValue>> {
        use crate::error::ExecTrailError;
        use crate::store::Source;
        use registry::{RegKey, BAM_KEYS, HKEY_LOCAL_MACHINE};

        let mut last_error = None;
        for path in BAM_KEYS {
            let root = match RegKey::open(HKEY_LOCAL_MACHINE, path) {
                Ok(root) => root,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };

            // One subkey per user SID
            let mut values = Vec::new();
            for sid in root.subkey_names() {
                match RegKey::open(HKEY_LOCAL_MACHINE, &format!("{path}\\{sid}")) {
                    Ok(user) => values.extend(user.values()),
                    Err(e) => tracing::debug!(%sid, error = %e, "BAM user key not readable"),
                }
            }
            return Ok(values);
        }

        Err(ExecTrailError::unavailable(
            Source::Bam,
            last_error.unwrap_or_else(|| "key not found".to_string()),
        ))
    }

    fn run_mru_values(&self) -> Result<Vec<RegistryValue>> {
        use crate::error::ExecTrailError;
        use crate::store::Source;
        use registry::{RegKey, HKEY_CURRENT_USER, RUN_MRU_KEY};

        RegKey::open(HKEY_CURRENT_USER, RUN_MRU_KEY)
            .map(|key| key.values())
            .map_err(|e| ExecTrailError::unavailable(Source::RunHistory, e))
    }
}

#[cfg(not(windows))]
impl ArtifactProvider for SystemArtifacts {
    fn prefetch_files(&self) -> Result<Vec<PrefetchFile>> {
        list_prefetch_files(&self.prefetch_dir)
    }

    fn userassist_values(&self) -> Result<Vec<RegistryValue>> {
        Err(no_registry(Source::UserAssist))
    }

    fn bam_values(&self) -> Result<Vec<RegistryValue>> {
        Err(no_registry(Source::Bam))
    }

    fn run_mru_values(&self) -> Result<Vec<RegistryValue>> {
        Err(no_registry(Source::RunHistory))
    }
}

#[cfg(not(windows))]
fn no_registry(source: Source) -> ExecTrailError {
    ExecTrailError::unavailable(source, "registry is only available on Windows")
}
