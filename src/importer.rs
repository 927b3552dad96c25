//! Import pipeline: parse a source file, partition the flat result
//! stream back into per-race groups, and persist everything in one
//! transaction.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::parser::{parse_text, ParseOptions, ParseOutcome};
use crate::storage::{RaceRepository, WriteCounts};
use crate::types::{ConfidenceTier, Race, RaceResult};

/// Failures the invoker must be able to tell apart: bad path, bad
/// format, and storage trouble are three different operator problems.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no importable records found in {0}")]
    NoRecords(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[source] anyhow::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Human- and machine-readable outcome of one import run.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub race_name: String,
    pub dry_run: bool,
    pub races_parsed: usize,
    pub results_parsed: usize,
    pub statistics_parsed: usize,
    pub skipped_blocks: usize,
    pub skipped_rows: usize,
    /// Per-stage rows written; None on dry runs.
    pub written: Option<WriteCounts>,
    /// Post-commit store verification; None on dry runs.
    pub verification: Option<VerificationReport>,
}

/// Post-import store state for the event, re-queried after commit.
#[derive(Debug, Serialize)]
pub struct VerificationReport {
    pub races_in_store: u32,
    pub results_in_store: u32,
    pub statistics_in_store: u32,
    /// Live running-style distribution (never persisted as an aggregate).
    pub running_styles: Vec<StyleCount>,
    /// Reliability of that distribution given how many runs back it.
    pub confidence: ConfidenceTier,
}

#[derive(Debug, Serialize)]
pub struct StyleCount {
    pub style: String,
    pub count: u32,
}

/// Read and parse one source file.
pub fn parse_file(input: &Path, opts: &ParseOptions) -> Result<ParseOutcome, ImportError> {
    let text = std::fs::read_to_string(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImportError::InputNotFound(input.to_path_buf()),
        _ => ImportError::InputUnreadable {
            path: input.to_path_buf(),
            source: e,
        },
    })?;

    let outcome = parse_text(&text, opts);
    info!(
        races = outcome.races.len(),
        results = outcome.results.len(),
        statistics = outcome.statistics.len(),
        skipped_blocks = outcome.skipped_blocks,
        skipped_rows = outcome.skipped_rows,
        "parse complete"
    );

    if outcome.races.is_empty() && outcome.statistics.is_empty() {
        return Err(ImportError::NoRecords(input.to_path_buf()));
    }
    Ok(outcome)
}

/// Split the flat result stream into per-race groups using each race's
/// declared starter count as the boundary.
///
/// The boundary advances by the declared count even when the actual rows
/// diverge; the mismatch is logged, not repaired, because the source has
/// no explicit per-row race association.
pub fn partition_results(
    races: Vec<Race>,
    results: Vec<RaceResult>,
) -> Vec<(Race, Vec<RaceResult>)> {
    let total = results.len();
    let mut groups = Vec::with_capacity(races.len());
    let mut idx = 0usize;

    for race in races {
        let declared = race.num_horses as usize;
        let start = idx.min(total);
        let end = (idx + declared).min(total);
        let group: Vec<RaceResult> = results[start..end].to_vec();
        if group.len() != declared {
            warn!(
                date = %race.race_date,
                declared,
                actual = group.len(),
                "result rows diverge from declared starter count"
            );
        }
        idx += declared;
        groups.push((race, group));
    }

    if idx < total {
        warn!(leftover = total - idx, "result rows beyond the last race boundary, dropped");
    }
    groups
}

/// Summary for a dry run: parse counts only, nothing touched.
pub fn dry_run_summary(outcome: &ParseOutcome, race_name: &str) -> ImportSummary {
    ImportSummary {
        race_name: race_name.to_string(),
        dry_run: true,
        races_parsed: outcome.races.len(),
        results_parsed: outcome.results.len(),
        statistics_parsed: outcome.statistics.len(),
        skipped_blocks: outcome.skipped_blocks,
        skipped_rows: outcome.skipped_rows,
        written: None,
        verification: None,
    }
}

/// Persist one parsed batch and verify what landed.
pub fn import_outcome(
    outcome: ParseOutcome,
    repo: &mut RaceRepository,
    race_name: &str,
) -> Result<ImportSummary, ImportError> {
    let ParseOutcome {
        races,
        results,
        statistics,
        skipped_blocks,
        skipped_rows,
    } = outcome;
    let races_parsed = races.len();
    let results_parsed = results.len();
    let statistics_parsed = statistics.len();

    let groups = partition_results(races, results);
    let written = repo.import_batch(&groups, &statistics)?;
    info!(
        races = written.races,
        results = written.results,
        statistics = written.statistics,
        "import committed"
    );

    let verification = verify(repo, race_name)?;

    Ok(ImportSummary {
        race_name: race_name.to_string(),
        dry_run: false,
        races_parsed,
        results_parsed,
        statistics_parsed,
        skipped_blocks,
        skipped_rows,
        written: Some(written),
        verification: Some(verification),
    })
}

/// Re-query the store after commit, including the live running-style
/// distribution and its confidence tier.
pub fn verify(repo: &RaceRepository, race_name: &str) -> Result<VerificationReport, ImportError> {
    let distribution = repo.running_style_distribution(race_name)?;
    let sample: u32 = distribution.iter().map(|(_, c)| c).sum();

    Ok(VerificationReport {
        races_in_store: repo.race_count(race_name)?,
        results_in_store: repo.result_count(race_name)?,
        statistics_in_store: repo.statistic_count(race_name)?,
        running_styles: distribution
            .into_iter()
            .map(|(style, count)| StyleCount {
                style: style.as_str().to_string(),
                count,
            })
            .collect(),
        confidence: ConfidenceTier::from_sample_size(sample),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn race(year: i32, num_horses: u32) -> Race {
        Race {
            race_name: "シンザン記念".to_string(),
            race_date: NaiveDate::from_ymd_opt(year, 1, 13).unwrap(),
            race_venue: "1回中京5日目".to_string(),
            track_name: "中京".to_string(),
            distance: 1600,
            surface: "芝".to_string(),
            track_condition: "良".to_string(),
            weather: "晴".to_string(),
            grade: "G3".to_string(),
            race_class: "サラ系3歳オープン".to_string(),
            num_horses,
        }
    }

    fn result(name: &str) -> RaceResult {
        RaceResult {
            horse_name: name.to_string(),
            finish_position: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_partition_by_declared_counts() {
        let races = vec![race(2023, 2), race(2022, 3)];
        let results = vec![
            result("a"),
            result("b"),
            result("c"),
            result("d"),
            result("e"),
        ];
        let groups = partition_results(races, results);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 3);
        assert_eq!(groups[1].1[0].horse_name, "c");
    }

    #[test]
    fn test_partition_boundary_advances_on_divergence() {
        // First race declares 3 starters but only 2 rows made it through;
        // the boundary still advances by 3, so the second race starts empty.
        let races = vec![race(2023, 3), race(2022, 1)];
        let results = vec![result("a"), result("b")];
        let groups = partition_results(races, results);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 0);
    }

    #[test]
    fn test_parse_file_not_found() {
        let opts = ParseOptions::new("シンザン記念", "G3");
        let err = parse_file(Path::new("/nonexistent/file.txt"), &opts).unwrap_err();
        assert!(matches!(err, ImportError::InputNotFound(_)));
    }

    #[test]
    fn test_parse_file_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "何も意味のないテキスト\n\n").unwrap();

        let opts = ParseOptions::new("シンザン記念", "G3");
        let err = parse_file(&path, &opts).unwrap_err();
        assert!(matches!(err, ImportError::NoRecords(_)));
    }

    #[test]
    fn test_import_outcome_and_idempotence() {
        let make_outcome = || ParseOutcome {
            races: vec![race(2023, 1)],
            results: vec![RaceResult {
                horse_name: "ライトクオンタム".to_string(),
                finish_position: Some(1),
                running_style: Some(crate::types::RunningStyle::MidPackCloser),
                ..Default::default()
            }],
            statistics: Vec::new(),
            skipped_blocks: 0,
            skipped_rows: 0,
        };

        let mut repo = RaceRepository::in_memory().unwrap();
        let summary = import_outcome(make_outcome(), &mut repo, "シンザン記念").unwrap();
        assert!(!summary.dry_run);
        assert_eq!(summary.written.as_ref().unwrap().races, 1);
        let v = summary.verification.as_ref().unwrap();
        assert_eq!(v.races_in_store, 1);
        assert_eq!(v.results_in_store, 1);
        assert_eq!(v.running_styles.len(), 1);
        assert_eq!(v.confidence, ConfidenceTier::Low);

        // Importing the identical outcome again leaves the store unchanged
        let summary = import_outcome(make_outcome(), &mut repo, "シンザン記念").unwrap();
        let v = summary.verification.as_ref().unwrap();
        assert_eq!(v.races_in_store, 1);
        assert_eq!(v.results_in_store, 1);
    }

    #[test]
    fn test_dry_run_summary_touches_nothing() {
        let outcome = ParseOutcome {
            races: vec![race(2023, 1)],
            results: vec![result("a")],
            statistics: Vec::new(),
            skipped_blocks: 1,
            skipped_rows: 2,
        };
        let summary = dry_run_summary(&outcome, "シンザン記念");
        assert!(summary.dry_run);
        assert_eq!(summary.races_parsed, 1);
        assert_eq!(summary.skipped_blocks, 1);
        assert_eq!(summary.skipped_rows, 2);
        assert!(summary.written.is_none());
        assert!(summary.verification.is_none());
    }
}
