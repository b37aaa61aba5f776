//! SQLite store for daily snapshots and engine settings.
//!
//! Each day's collected data is stored as one JSON document together with
//! its SHA-256 digest. A document whose digest no longer matches is treated
//! as missing rather than trusted.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::store::{summarize, DailySnapshot, PeriodSummary};
use chrono::{Days, Local, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Date key format for snapshots.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshot and settings database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens or creates the database at the default location.
    ///
    /// Creates <data dir>/exectrail/exectrail.db if it doesn't exist.
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::get_db_path())
    }

    /// Opens or creates the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = ?path, "Opening database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Returns the default database path.
    fn get_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("exectrail")
            .join("exectrail.db")
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- One JSON document per day
            CREATE TABLE IF NOT EXISTS daily_snapshots (
                date TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                digest TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );

            -- Configuration settings
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        // Seed any setting that is not there yet
        let now = Utc::now().to_rfc3339();
        let mut seeded = 0;
        for (key, value, description) in EngineConfig::default().as_settings() {
            seeded += self.conn.execute(
                "INSERT OR IGNORE INTO config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![key, value, description, &now],
            )?;
        }
        if seeded > 0 {
            tracing::info!("Added {} default config settings", seeded);
        }

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    // === Snapshot Methods ===

    /// Saves (or replaces) the snapshot for `snapshot.date`.
    pub fn save_snapshot(&self, snapshot: &DailySnapshot) -> Result<()> {
        let saved_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut stamped = snapshot.clone();
        stamped.saved_at = Some(saved_at.clone());

        let payload = serde_json::to_string(&stamped)?;
        let digest = digest_of(&payload);

        self.conn.execute(
            "INSERT OR REPLACE INTO daily_snapshots (date, payload, digest, saved_at) VALUES (?1, ?2, ?3, ?4)",
            params![stamped.date, payload, digest, saved_at],
        )?;

        tracing::info!(date = %stamped.date, "Daily snapshot saved");
        Ok(())
    }

    /// Loads the snapshot for `date`.
    ///
    /// Returns `Ok(None)` when there is none or its digest does not match.
    pub fn load_snapshot(&self, date: &str) -> Result<Option<DailySnapshot>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT payload, digest FROM daily_snapshots WHERE date = ?1",
                params![date],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, digest)) = row else {
            return Ok(None);
        };

        if digest_of(&payload) != digest {
            tracing::warn!(date, "Snapshot digest mismatch, skipping");
            return Ok(None);
        }

        match serde_json::from_str(&payload) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(date, error = %e, "Snapshot failed to parse, skipping");
                Ok(None)
            }
        }
    }

    /// Dates that have a stored snapshot, newest first.
    pub fn available_dates(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date FROM daily_snapshots ORDER BY date DESC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Loads every readable snapshot with `start <= date <= end`, newest first.
    pub fn snapshots_in_range(&self, start: &str, end: &str) -> Result<Vec<DailySnapshot>> {
        let mut snapshots = Vec::new();
        for date in self.available_dates()? {
            if date.as_str() < start || date.as_str() > end {
                continue;
            }
            if let Some(snapshot) = self.load_snapshot(&date)? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    /// Summarizes the `days` before `today` (inclusive of both ends).
    pub fn summarize_recent(&self, days: u32, today: NaiveDate) -> Result<PeriodSummary> {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        let snapshots = self.snapshots_in_range(
            &start.format(DATE_FORMAT).to_string(),
            &today.format(DATE_FORMAT).to_string(),
        )?;
        Ok(summarize(&snapshots, days))
    }

    // === Config Methods ===

    /// Gets a configuration value by key.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Sets a configuration value.
    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, &now],
        )?;
        Ok(())
    }

    /// Gets all config settings.
    pub fn get_all_config(&self) -> Result<Vec<(String, String, Option<String>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, description FROM config ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    #[cfg(test)]
    fn corrupt_snapshot(&self, date: &str) {
        self.conn
            .execute(
                "UPDATE daily_snapshots SET payload = replace(payload, 'example', 'exampIe') WHERE date = ?1",
                params![date],
            )
            .unwrap();
    }
}

fn digest_of(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GameStat, VisitRecord};

    fn snapshot(date: &str, domains: &[&str]) -> DailySnapshot {
        DailySnapshot {
            date: date.to_string(),
            browser_history: domains
                .iter()
                .map(|d| VisitRecord {
                    domain: d.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.available_dates().unwrap().is_empty());
        assert_eq!(db.get_config("lookback_days").unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let mut snap = snapshot("2024-01-08", &["example.com"]);
        snap.roblox.game_stats.push(GameStat {
            game_name: "Doors".to_string(),
            play_count: 2,
        });

        db.save_snapshot(&snap).unwrap();
        let loaded = db.load_snapshot("2024-01-08").unwrap().unwrap();

        assert_eq!(loaded.browser_history, snap.browser_history);
        assert_eq!(loaded.roblox, snap.roblox);
        assert!(loaded.saved_at.is_some());
        assert!(db.load_snapshot("2024-01-09").unwrap().is_none());
    }

    #[test]
    fn test_tampered_snapshot_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        db.save_snapshot(&snapshot("2024-01-08", &["example.com"])).unwrap();

        db.corrupt_snapshot("2024-01-08");

        assert!(db.load_snapshot("2024-01-08").unwrap().is_none());
        assert!(db.snapshots_in_range("2024-01-01", "2024-01-31").unwrap().is_empty());
    }

    #[test]
    fn test_dates_and_range() {
        let db = Database::open_in_memory().unwrap();
        for date in ["2024-01-05", "2024-01-08", "2023-12-31"] {
            db.save_snapshot(&snapshot(date, &[])).unwrap();
        }

        assert_eq!(
            db.available_dates().unwrap(),
            ["2024-01-08", "2024-01-05", "2023-12-31"]
        );

        let range = db.snapshots_in_range("2024-01-01", "2024-01-08").unwrap();
        let dates: Vec<_> = range.iter().map(|s| s.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-08", "2024-01-05"]);
    }

    #[test]
    fn test_summarize_recent() {
        let db = Database::open_in_memory().unwrap();
        db.save_snapshot(&snapshot("2024-01-08", &["a.com", "b.com"])).unwrap();
        db.save_snapshot(&snapshot("2024-01-02", &["a.com"])).unwrap();
        db.save_snapshot(&snapshot("2023-12-01", &["old.com"])).unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let summary = db.summarize_recent(7, today).unwrap();

        assert_eq!(summary.data_count, 2);
        assert_eq!(summary.total_visits, 3);
        assert_eq!(summary.top_domains[0].name, "a.com");
        assert_eq!(summary.top_domains[0].count, 2);
    }

    #[test]
    fn test_config_round_trip() {
        let db = Database::open_in_memory().unwrap();

        db.set_config("lookback_days", "14").unwrap();
        db.set_config("custom_key", "x").unwrap();

        assert_eq!(db.get_config("lookback_days").unwrap().as_deref(), Some("14"));
        assert_eq!(db.get_config("custom_key").unwrap().as_deref(), Some("x"));
        assert_eq!(db.get_config("missing").unwrap(), None);
        assert!(db.get_all_config().unwrap().len() >= 6);
    }

    #[test]
    fn test_open_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("exectrail.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.save_snapshot(&snapshot("2024-01-08", &[])).unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.available_dates().unwrap(), ["2024-01-08"]);
    }
}
