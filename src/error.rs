//! Error types for collection, persistence and serving.
//!
//! Collection never propagates these past a collector: they end up as
//! diagnostics on the pass. Only the snapshot store and startup code
//! return them to callers.

use crate::store::Source;
use thiserror::Error;

/// Shared `Result` alias.
pub type Result<T> = std::result::Result<T, ExecTrailError>;

#[derive(Debug, Error)]
pub enum ExecTrailError {
    /// A whole artifact source could not be reached.
    #[error("{artifact} unavailable: {reason}")]
    SourceUnavailable { artifact: Source, reason: String },

    /// A single artifact item failed to decode.
    #[error("malformed {artifact} record: {reason}")]
    RecordMalformed { artifact: Source, reason: String },

    /// A timestamp that cannot be right (zeroed, pre-epoch, end before start).
    #[error("clock anomaly: {details}")]
    ClockAnomaly { details: String },

    #[error("database failure: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO failure: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecTrailError {
    /// Convenience constructor for an unreachable source.
    pub fn unavailable(artifact: Source, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            artifact,
            reason: reason.into(),
        }
    }

    /// Whether the failure only affects part of a collection pass.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::RecordMalformed { .. } | Self::ClockAnomaly { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ExecTrailError::unavailable(Source::Prefetch, "access denied");
        assert_eq!(err.to_string(), "Prefetch unavailable: access denied");
        assert!(err.is_partial());
    }

    #[test]
    fn test_from_serde() {
        let parse_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ExecTrailError = parse_err.into();
        assert!(matches!(err, ExecTrailError::Serialization(_)));
        assert!(!err.is_partial());
    }
}
