//! SQLite repository for imported race data.
//!
//! One import batch is written inside a single transaction: races are
//! upserted on (race_name, race_date), each race's results are replaced
//! wholesale, and statistics are upserted on (race_name, category,
//! condition). Re-importing the same file is a no-op state-wise.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use std::path::Path;

use super::schema::create_tables;
use crate::types::{Race, RaceResult, RaceStatistic, RunningStyle, StatCategory};

/// Rows written by one committed batch, per stage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WriteCounts {
    pub races: usize,
    pub results: usize,
    pub statistics: usize,
}

/// Repository owning the database connection.
pub struct RaceRepository {
    conn: Connection,
}

impl RaceRepository {
    /// Open (creating if needed) the database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Import ====================

    /// Write one parsed batch all-or-nothing.
    ///
    /// `groups` pairs each race with the result rows attributed to it.
    /// On any failure the transaction rolls back and nothing persists.
    pub fn import_batch(
        &mut self,
        groups: &[(Race, Vec<RaceResult>)],
        statistics: &[RaceStatistic],
    ) -> Result<WriteCounts> {
        let tx = self.conn.transaction()?;
        let mut counts = WriteCounts::default();

        for (race, results) in groups {
            let race_id = upsert_race(&tx, race)
                .with_context(|| format!("Failed to upsert race {}", race.race_date))?;
            counts.races += 1;

            replace_results(&tx, race_id, results)
                .with_context(|| format!("Failed to write results for {}", race.race_date))?;
            counts.results += results.len();
        }

        for stat in statistics {
            upsert_statistic(&tx, stat).with_context(|| {
                format!("Failed to upsert statistic {}/{}", stat.category, stat.condition)
            })?;
            counts.statistics += 1;
        }

        tx.commit().context("Failed to commit import batch")?;
        Ok(counts)
    }

    // ==================== Query Operations ====================

    pub fn race_count(&self, race_name: &str) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM races WHERE race_name = ?1",
            [race_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn result_count(&self, race_name: &str) -> Result<u32> {
        let count = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM race_results rr
            JOIN races r ON rr.race_id = r.race_id
            WHERE r.race_name = ?1
            "#,
            [race_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn statistic_count(&self, race_name: &str) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM race_statistics WHERE race_name = ?1",
            [race_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Live running-style distribution over all stored results for an
    /// event. Never persisted; always recomputed here.
    pub fn running_style_distribution(&self, race_name: &str) -> Result<Vec<(RunningStyle, u32)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT rr.running_style, COUNT(*)
            FROM race_results rr
            JOIN races r ON rr.race_id = r.race_id
            WHERE r.race_name = ?1 AND rr.running_style IS NOT NULL
            GROUP BY rr.running_style
            ORDER BY COUNT(*) DESC
            "#,
        )?;

        let rows = stmt
            .query_map([race_name], |row| {
                let label: String = row.get(0)?;
                let count: u32 = row.get(1)?;
                Ok((label, count))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(label, count)| RunningStyle::from_str_label(&label).map(|s| (s, count)))
            .collect())
    }

    /// Fetch the statistics for one category, ordered by condition
    /// (1人気 before 2人気 before the range buckets; gates numerically).
    pub fn get_statistics(
        &self,
        race_name: &str,
        category: StatCategory,
    ) -> Result<Vec<RaceStatistic>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT condition, total_runs, wins, seconds, places,
                   win_rate, place_rate, show_rate, years_analyzed, counts_estimated
            FROM race_statistics
            WHERE race_name = ?1 AND category = ?2
            "#,
        )?;

        let mut stats = stmt
            .query_map(params![race_name, category.as_str()], |row| {
                Ok(RaceStatistic {
                    race_name: race_name.to_string(),
                    category,
                    condition: row.get(0)?,
                    total_runs: row.get(1)?,
                    wins: row.get(2)?,
                    seconds: row.get(3)?,
                    places: row.get(4)?,
                    win_rate: row.get(5)?,
                    place_rate: row.get(6)?,
                    show_rate: row.get(7)?,
                    years_analyzed: row.get(8)?,
                    counts_estimated: row.get::<_, i64>(9)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        stats.sort_by_key(|s| condition_sort_key(category, &s.condition));
        Ok(stats)
    }

    /// Live win/place aggregates grouped by each runner's popularity in
    /// its previous start (前走人気別成績).
    pub fn previous_popularity_breakdown(&self, race_name: &str) -> Result<Vec<EliminationStat>> {
        self.elimination_breakdown(race_name, "previous_popularity", "前走{}番人気")
    }

    /// Live win/place aggregates grouped by each runner's finish in its
    /// previous start (前走着順別成績).
    pub fn previous_finish_breakdown(&self, race_name: &str) -> Result<Vec<EliminationStat>> {
        self.elimination_breakdown(race_name, "previous_finish_position", "前走{}着")
    }

    fn elimination_breakdown(
        &self,
        race_name: &str,
        column: &str,
        label_pattern: &str,
    ) -> Result<Vec<EliminationStat>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT rr.{col},
                   COUNT(*),
                   SUM(CASE WHEN rr.finish_position = 1 THEN 1 ELSE 0 END),
                   SUM(CASE WHEN rr.finish_position <= 3 THEN 1 ELSE 0 END)
            FROM race_results rr
            JOIN races r ON rr.race_id = r.race_id
            WHERE r.race_name = ?1 AND rr.{col} IS NOT NULL
            GROUP BY rr.{col}
            ORDER BY rr.{col}
            "#,
            col = column
        ))?;

        let rows = stmt
            .query_map([race_name], |row| {
                let value: u32 = row.get(0)?;
                let total: u32 = row.get(1)?;
                let wins: u32 = row.get(2)?;
                let places: u32 = row.get(3)?;
                Ok((value, total, wins, places))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(value, total, wins, places)| EliminationStat {
                condition: label_pattern.replacen("{}", &value.to_string(), 1),
                total,
                wins,
                places,
                win_rate: percent(wins, total),
                place_rate: percent(places, total),
            })
            .collect())
    }
}

/// One bucket of the live elimination aggregates (前走条件別成績).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliminationStat {
    pub condition: String,
    pub total: u32,
    pub wins: u32,
    pub places: u32,
    pub win_rate: f64,
    pub place_rate: f64,
}

/// Percentage rounded to one decimal place; zero totals yield 0.0.
fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Sort key for condition labels, matching how the read side orders
/// them: gate labels numerically; popularity labels 1人気..3人気 first,
/// range buckets (〜) by leading digit, anything else last.
fn condition_sort_key(category: StatCategory, condition: &str) -> u32 {
    match category {
        StatCategory::PostPosition => leading_digits(condition).unwrap_or(u32::MAX),
        StatCategory::Popularity => match condition {
            "1人気" => 1,
            "2人気" => 2,
            "3人気" => 3,
            c if c.contains('〜') => leading_digits(c).unwrap_or(99),
            _ => 99,
        },
    }
}

fn leading_digits(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Upsert on (race_name, race_date); descriptive fields are refreshed,
/// created_at is preserved. Returns the resolved race_id.
fn upsert_race(tx: &Transaction<'_>, race: &Race) -> Result<i64> {
    tx.execute(
        r#"
        INSERT INTO races
        (race_name, race_date, race_venue, track_name, distance, surface,
         track_condition, weather, grade, race_class, num_horses)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(race_name, race_date) DO UPDATE SET
            race_venue = excluded.race_venue,
            track_name = excluded.track_name,
            distance = excluded.distance,
            surface = excluded.surface,
            track_condition = excluded.track_condition,
            weather = excluded.weather,
            grade = excluded.grade,
            race_class = excluded.race_class,
            num_horses = excluded.num_horses
        "#,
        params![
            race.race_name,
            race.race_date.to_string(),
            race.race_venue,
            race.track_name,
            race.distance,
            race.surface,
            race.track_condition,
            race.weather,
            race.grade,
            race.race_class,
            race.num_horses,
        ],
    )?;

    let race_id = tx.query_row(
        "SELECT race_id FROM races WHERE race_name = ?1 AND race_date = ?2",
        params![race.race_name, race.race_date.to_string()],
        |row| row.get(0),
    )?;
    Ok(race_id)
}

/// Replace a race's result rows wholesale so re-imports cannot double up.
fn replace_results(tx: &Transaction<'_>, race_id: i64, results: &[RaceResult]) -> Result<()> {
    tx.execute("DELETE FROM race_results WHERE race_id = ?1", [race_id])?;

    let mut stmt = tx.prepare(
        r#"
        INSERT INTO race_results
        (race_id, finish_position, post_position, horse_name, horse_age,
         horse_sex, popularity, jockey_name, jockey_weight, trainer_name,
         finish_time_raw, finish_time_secs, last_3f, horse_weight,
         weight_change, passing_positions, running_style, sire,
         broodmare_sire, previous_race, days_since_last_run,
         previous_popularity, previous_finish_position)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
        "#,
    )?;

    for result in results {
        stmt.execute(params![
            race_id,
            result.finish_position,
            result.post_position,
            result.horse_name,
            result.horse_age,
            result.horse_sex,
            result.popularity,
            result.jockey_name,
            result.jockey_weight,
            result.trainer_name,
            result.finish_time_raw,
            result.finish_time_secs,
            result.last_3f,
            result.horse_weight,
            result.weight_change,
            result.passing_positions,
            result.running_style.map(|s| s.as_str()),
            result.sire,
            result.broodmare_sire,
            result.previous_race,
            result.days_since_last_run,
            result.previous_popularity,
            result.previous_finish_position,
        ])?;
    }
    Ok(())
}

/// Upsert on (race_name, category, condition); numeric fields and the
/// freshness timestamp are refreshed on conflict.
fn upsert_statistic(tx: &Transaction<'_>, stat: &RaceStatistic) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO race_statistics
        (race_name, category, condition, total_runs, wins, seconds, places,
         win_rate, place_rate, show_rate, years_analyzed, counts_estimated,
         last_updated)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))
        ON CONFLICT(race_name, category, condition) DO UPDATE SET
            total_runs = excluded.total_runs,
            wins = excluded.wins,
            seconds = excluded.seconds,
            places = excluded.places,
            win_rate = excluded.win_rate,
            place_rate = excluded.place_rate,
            show_rate = excluded.show_rate,
            years_analyzed = excluded.years_analyzed,
            counts_estimated = excluded.counts_estimated,
            last_updated = datetime('now')
        "#,
        params![
            stat.race_name,
            stat.category.as_str(),
            stat.condition,
            stat.total_runs,
            stat.wins,
            stat.seconds,
            stat.places,
            stat.win_rate,
            stat.place_rate,
            stat.show_rate,
            stat.years_analyzed,
            stat.counts_estimated as i64,
        ],
    )?;
    Ok(())
}
