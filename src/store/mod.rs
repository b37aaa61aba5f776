//! Data model, reconciliation and aggregation.
//!
//! Also owns the process-wide handles: the snapshot database and the
//! latest collection pass served by the HTTP API.

pub mod aggregator;
pub mod reconcile;
pub mod types;

pub use aggregator::*;
pub use reconcile::*;
pub use types::*;

use crate::collect::CollectionPass;
use crate::database::{Database, DATE_FORMAT};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, RwLock};

/// Global database connection (initialized on first use).
pub static DATABASE: Lazy<Option<Arc<Mutex<Database>>>> = Lazy::new(|| match Database::open() {
    Ok(db) => {
        tracing::info!("Database initialized successfully");
        Some(Arc::new(Mutex::new(db)))
    }
    Err(e) => {
        tracing::error!(
            error = %e,
            "Failed to initialize database, running without persistence"
        );
        None
    }
});

/// Most recent collection pass, shared with the HTTP handlers.
pub static LATEST_PASS: Lazy<Arc<RwLock<Option<CollectionPass>>>> =
    Lazy::new(|| Arc::new(RwLock::new(None)));

/// Publishes a finished pass for the HTTP handlers.
pub fn publish_pass(pass: CollectionPass) {
    match LATEST_PASS.write() {
        Ok(mut latest) => *latest = Some(pass),
        Err(_) => tracing::error!("Collection pass lock poisoned, pass not published"),
    }
}

/// Builds the snapshot for `date` from a pass.
///
/// Sections filled by other collectors (browser history, recent files,
/// games) are carried over from `existing` when present.
pub fn build_snapshot(
    existing: Option<DailySnapshot>,
    pass: &CollectionPass,
    date: NaiveDate,
) -> DailySnapshot {
    let view = pass.history.for_date(date).reconciled();
    let mut snapshot = existing.unwrap_or_default();

    snapshot.date = date.format(DATE_FORMAT).to_string();
    snapshot.programs = view.programs;
    snapshot.run_history = view.run_history;
    snapshot.daily_usage = pass.daily_usage.to_secs_map();
    snapshot
}

/// Saves the pass as the snapshot for `date`, if a database is available.
pub fn save_pass_snapshot(pass: &CollectionPass, date: NaiveDate) {
    let Some(db_arc) = DATABASE.as_ref() else {
        return;
    };

    let Ok(db) = db_arc.lock() else {
        tracing::error!("Database lock poisoned, snapshot not saved");
        return;
    };

    let key = date.format(DATE_FORMAT).to_string();
    let existing = db.load_snapshot(&key).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load existing snapshot");
        None
    });

    if let Err(e) = db.save_snapshot(&build_snapshot(existing, pass, date)) {
        tracing::warn!(error = %e, "Failed to save daily snapshot");
    }
}
