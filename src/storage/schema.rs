//! SQLite schema for imported race data.
//!
//! Tables:
//! - races: one row per historical running, natural key (race_name, race_date)
//! - race_results: per-horse finishing records
//! - race_statistics: aggregated condition buckets, natural key
//!   (race_name, category, condition)
//!
//! Running-style aggregates are deliberately absent: they are recomputed
//! live from race_results.

use rusqlite::{Connection, Result};

/// Create all tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS races (
            race_id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_name TEXT NOT NULL,
            race_date TEXT NOT NULL,
            race_venue TEXT,
            track_name TEXT,
            distance INTEGER NOT NULL,
            surface TEXT,
            track_condition TEXT,
            weather TEXT,
            grade TEXT,
            race_class TEXT,
            num_horses INTEGER NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            UNIQUE(race_name, race_date)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS race_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id INTEGER NOT NULL REFERENCES races(race_id),
            finish_position INTEGER,
            post_position INTEGER,
            horse_name TEXT NOT NULL,
            horse_age INTEGER,
            horse_sex TEXT,
            popularity INTEGER,
            jockey_name TEXT,
            jockey_weight REAL,
            trainer_name TEXT,
            finish_time_raw TEXT,
            finish_time_secs REAL,
            last_3f REAL,
            horse_weight INTEGER,
            weight_change INTEGER,
            passing_positions TEXT,
            running_style TEXT,
            sire TEXT,
            broodmare_sire TEXT,
            previous_race TEXT,
            days_since_last_run INTEGER,
            previous_popularity INTEGER,
            previous_finish_position INTEGER
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS race_statistics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_name TEXT NOT NULL,
            category TEXT NOT NULL,
            condition TEXT NOT NULL,
            total_runs INTEGER NOT NULL,
            wins INTEGER NOT NULL,
            seconds INTEGER NOT NULL,
            places INTEGER NOT NULL,
            win_rate REAL NOT NULL,
            place_rate REAL NOT NULL,
            show_rate REAL NOT NULL,
            years_analyzed INTEGER NOT NULL,
            counts_estimated INTEGER NOT NULL DEFAULT 0,
            last_updated TEXT DEFAULT (datetime('now')),
            UNIQUE(race_name, category, condition)
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_races_name ON races(race_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_race ON race_results(race_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stats_name_category ON race_statistics(race_name, category)",
        [],
    )?;

    Ok(())
}
