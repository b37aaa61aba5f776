//! ExecTrail - program execution and usage provenance for Windows.
//!
//! Reads the execution artifacts Windows leaves behind (Prefetch,
//! UserAssist, BAM, RunMRU) plus session events from the event log,
//! reconciles them into one program history, and keeps daily snapshots.

pub mod artifacts;
pub mod codec;
pub mod collect;
pub mod config;
pub mod database;
pub mod error;
pub mod server;
pub mod store;
pub mod winapi_utils;

pub use error::{ExecTrailError, Result};
