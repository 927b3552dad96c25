//! Aggregated statistics table parsing (人気 / 枠順 sections).
//!
//! Exports close with a statistics section of fixed-width category
//! tables. Only the popularity and gate-position categories are
//! imported; others (年齢, 所属, ...) are scanned past. Two source
//! variants exist: one prints raw counts alongside rates, the other
//! prints rates only. Rates-only rows get their counts back-computed
//! from an assumed sample size and are flagged as estimated.

use tracing::{debug, warn};

use super::cursor::LineCursor;
use super::fields;
use super::scanner::{classify, LineKind, STATS_HEADER_TOKEN};
use crate::types::{RaceStatistic, StatCategory};

/// Minimum tab-field count for a statistics row.
pub const MIN_FIELDS_STAT: usize = 7;

/// Assumed per-condition sample sizes for rates-only tables.
#[derive(Debug, Clone, Copy)]
pub struct AssumedSamples {
    pub popularity: u32,
    pub post_position: u32,
}

impl Default for AssumedSamples {
    fn default() -> Self {
        Self {
            popularity: 10,
            post_position: 20,
        }
    }
}

impl AssumedSamples {
    fn for_category(&self, category: StatCategory) -> u32 {
        match category {
            StatCategory::Popularity => self.popularity,
            StatCategory::PostPosition => self.post_position,
        }
    }
}

/// Consume the whole statistics section (cursor on the section marker).
pub fn parse_statistics_section(
    cursor: &mut LineCursor<'_>,
    race_name: &str,
    years_analyzed: u32,
    samples: AssumedSamples,
) -> Vec<RaceStatistic> {
    // Skip the section marker itself.
    cursor.advance();

    let mut stats = Vec::new();
    while let Some(line) = cursor.current() {
        match classify(line) {
            LineKind::CategoryHeader(category) => {
                stats.extend(parse_category_table(
                    cursor,
                    category,
                    race_name,
                    years_analyzed,
                    samples,
                ));
            }
            LineKind::SkippedCategory => {
                debug!(line = cursor.line_number(), "skipping unimported category table");
                skip_table(cursor);
            }
            LineKind::YearHeader => break,
            _ => cursor.advance(),
        }
    }
    stats
}

/// Consume one recognized category table (cursor on its marker line).
fn parse_category_table(
    cursor: &mut LineCursor<'_>,
    category: StatCategory,
    race_name: &str,
    years_analyzed: u32,
    samples: AssumedSamples,
) -> Vec<RaceStatistic> {
    let marker_line = cursor.line_number();
    cursor.advance();

    // The column-header line must carry the required token.
    match cursor.current() {
        Some(line) if line.contains(STATS_HEADER_TOKEN) => cursor.advance(),
        _ => {
            warn!(
                line = marker_line,
                category = category.as_str(),
                "category table missing {} header, skipping",
                STATS_HEADER_TOKEN
            );
            skip_table(cursor);
            return Vec::new();
        }
    }

    let mut stats = Vec::new();
    while let Some(line) = cursor.current() {
        if !line.contains('\t') {
            break;
        }
        if let Some(stat) = parse_stat_row(
            line,
            category,
            race_name,
            years_analyzed,
            samples.for_category(category),
        ) {
            stats.push(stat);
        } else {
            debug!(line = cursor.line_number(), "skipping unparsable statistics row");
        }
        cursor.advance();
    }
    stats
}

/// Scan forward past an unrecognized table: stop at the next blank or
/// non-tabular line without emitting anything.
fn skip_table(cursor: &mut LineCursor<'_>) {
    cursor.advance();
    while let Some(line) = cursor.current() {
        if line.trim().is_empty() || !line.contains('\t') {
            break;
        }
        cursor.advance();
    }
}

/// Parse one statistics row.
///
/// Counts variant: condition, total, wins, seconds, places, win%, place%,
/// show%. Rates variant: condition plus trailing win%/place%/show%, with
/// counts estimated from the assumed sample size.
fn parse_stat_row(
    line: &str,
    category: StatCategory,
    race_name: &str,
    years_analyzed: u32,
    assumed_sample: u32,
) -> Option<RaceStatistic> {
    let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
    if parts.len() < MIN_FIELDS_STAT {
        return None;
    }

    let condition = parts[0];
    if condition.is_empty() || condition.starts_with("条件") {
        return None;
    }

    // Rates are always the last three columns.
    let n = parts.len();
    let win_rate = fields::parse_f64(parts[n - 3])?;
    let place_rate = fields::parse_f64(parts[n - 2])?;
    let show_rate = fields::parse_f64(parts[n - 1])?;

    let counts: Option<[u32; 4]> = if parts.len() >= 8 {
        let parsed: Vec<Option<u32>> = parts[1..5].iter().map(|s| fields::parse_u32(s)).collect();
        match (parsed[0], parsed[1], parsed[2], parsed[3]) {
            (Some(t), Some(w), Some(s), Some(p)) => Some([t, w, s, p]),
            _ => None,
        }
    } else {
        None
    };

    let (total_runs, wins, seconds, places, counts_estimated) = match counts {
        Some([t, w, s, p]) => (t, w, s, p, false),
        None => {
            // Rates-only variant: back out counts from the assumed sample.
            let total = assumed_sample;
            let wins = (win_rate * total as f64 / 100.0) as u32;
            let seconds = ((place_rate - win_rate).max(0.0) * total as f64 / 100.0) as u32;
            let places = ((show_rate - place_rate).max(0.0) * total as f64 / 100.0) as u32;
            (total, wins, seconds, places, true)
        }
    };

    Some(RaceStatistic {
        race_name: race_name.to_string(),
        category,
        condition: condition.to_string(),
        total_runs,
        wins,
        seconds,
        places,
        win_rate,
        place_rate,
        show_rate,
        years_analyzed,
        counts_estimated,
    })
}
