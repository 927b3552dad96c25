//! Parser for keibalab-style race result text exports.
//!
//! The export is a flat UTF-8 text file: race blocks (year header plus
//! date/venue lines plus tab-delimited result rows) followed by an
//! aggregated-statistics section. One shared forward-only cursor walks
//! the lines; classification decides which sub-parser consumes them.

pub mod cursor;
pub mod fields;
pub mod header;
pub mod result_row;
pub mod scanner;
pub mod statistics;

use tracing::{debug, trace, warn};

use crate::types::{Race, RaceResult, RaceStatistic};
use cursor::LineCursor;
use header::{parse_header_block, HEADER_LOOKAHEAD};
use result_row::{parse_result_row, parse_winner_row};
use scanner::{classify, LineKind};
use statistics::{parse_statistics_section, AssumedSamples};

/// Parser settings supplied by the invoker.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Event name shared by every race block in the file.
    pub race_name: String,
    pub grade: String,
    pub years_analyzed: u32,
    pub assumed_samples: AssumedSamples,
    /// Max continuation lines a header block may span.
    pub header_lookahead: usize,
}

impl ParseOptions {
    pub fn new(race_name: impl Into<String>, grade: impl Into<String>) -> Self {
        Self {
            race_name: race_name.into(),
            grade: grade.into(),
            years_analyzed: 10,
            assumed_samples: AssumedSamples::default(),
            header_lookahead: HEADER_LOOKAHEAD,
        }
    }
}

/// Everything extracted from one source file.
///
/// `results` is a flat stream in source order; the importer partitions it
/// back into per-race groups using each race's declared starter count.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub races: Vec<Race>,
    pub results: Vec<RaceResult>,
    pub statistics: Vec<RaceStatistic>,
    /// Header blocks dropped for lacking a parsable year or date.
    pub skipped_blocks: usize,
    /// Tab rows dropped for falling below the minimum field count.
    pub skipped_rows: usize,
}

/// Parse one export end to end.
pub fn parse_text(input: &str, opts: &ParseOptions) -> ParseOutcome {
    let mut cursor = LineCursor::new(input);
    let mut outcome = ParseOutcome::default();

    while let Some(line) = cursor.current() {
        let kind = classify(line);
        trace!(line = cursor.line_number(), ?kind, "classified");
        match kind {
            LineKind::YearHeader => parse_race_block(&mut cursor, opts, &mut outcome),
            LineKind::StatsSection => {
                let stats = parse_statistics_section(
                    &mut cursor,
                    &opts.race_name,
                    opts.years_analyzed,
                    opts.assumed_samples,
                );
                debug!(count = stats.len(), "statistics section parsed");
                outcome.statistics.extend(stats);
            }
            _ => cursor.advance(),
        }
    }

    outcome
}

/// Consume one race block: header, optional embedded winner row, then
/// result rows until a terminator. A block that never resolves to a full
/// Race is discarded whole, rows included.
fn parse_race_block(cursor: &mut LineCursor<'_>, opts: &ParseOptions, outcome: &mut ParseOutcome) {
    let block_line = cursor.line_number();
    let Some(block) = parse_header_block(cursor, opts.header_lookahead) else {
        outcome.skipped_blocks += 1;
        return;
    };

    let mut rows: Vec<RaceResult> = Vec::new();
    let mut skipped = 0usize;

    if let Some(raw) = block.winner_row_raw.as_deref() {
        match parse_winner_row(raw) {
            Some(winner) => rows.push(winner),
            None => {
                warn!(line = block_line, "embedded winner row unparsable, skipping");
                skipped += 1;
            }
        }
    }

    while let Some(line) = cursor.current() {
        if classify(line) != LineKind::TabularRow {
            break;
        }
        match parse_result_row(line) {
            Some(result) => rows.push(result),
            None => {
                warn!(line = cursor.line_number(), "result row below minimum fields, skipping");
                skipped += 1;
            }
        }
        cursor.advance();
    }

    match block.into_race(&opts.race_name, &opts.grade) {
        Some(race) => {
            debug!(
                date = %race.race_date,
                results = rows.len(),
                "race block parsed"
            );
            outcome.races.push(race);
            outcome.results.extend(rows);
            outcome.skipped_rows += skipped;
        }
        None => {
            warn!(
                line = block_line,
                dropped_rows = rows.len(),
                "race block without a full date, discarding"
            );
            outcome.skipped_blocks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn winner_fields() -> String {
        [
            "5", "ライトクオンタム", "牝3", "1", "武豊", "56.0", "友道康夫", "1:33.8",
            "34.1", "466(-2)", "①①①", "ディープインパクト", "シンボリクリスエス",
            "新馬", "4週", "1", "1",
        ]
        .join("\t")
    }

    fn loser_fields(finish: usize, gate: usize) -> String {
        [
            finish.to_string(),
            gate.to_string(),
            format!("ホース{}", finish),
            "牡3".to_string(),
            finish.to_string(),
            "騎手".to_string(),
            "56.0".to_string(),
            "調教師".to_string(),
            "1:34.0".to_string(),
            "34.8".to_string(),
            "480(0)".to_string(),
            "⑧⑧⑧".to_string(),
            "父".to_string(),
            "母父".to_string(),
            "前走".to_string(),
            "8週".to_string(),
            "3".to_string(),
            "5".to_string(),
        ]
        .join("\t")
    }

    /// The end-to-end scenario: one block, embedded winner, 15 more rows.
    #[test]
    fn test_full_block_round_trip() {
        let mut text = String::from("2023年 サラ系3歳オープン 芝1600m 晴 良 16頭\n1/13\n");
        text.push_str(&format!("1回中京5日目\t{}\n", winner_fields()));
        for i in 2..=16 {
            text.push_str(&loser_fields(i, i));
            text.push('\n');
        }
        text.push('\n');

        let opts = ParseOptions::new("シンザン記念", "G3");
        let outcome = parse_text(&text, &opts);

        assert_eq!(outcome.races.len(), 1);
        let race = &outcome.races[0];
        assert_eq!(race.race_date, NaiveDate::from_ymd_opt(2023, 1, 13).unwrap());
        assert_eq!(race.surface, "芝");
        assert_eq!(race.distance, 1600);
        assert_eq!(race.num_horses, 16);

        assert_eq!(outcome.results.len(), 16);
        assert_eq!(outcome.results[0].finish_position, Some(1));
        assert_eq!(outcome.results[0].horse_name, "ライトクオンタム");
        assert_eq!(outcome.results[1].finish_position, Some(2));
        assert_eq!(outcome.skipped_blocks, 0);
        assert_eq!(outcome.skipped_rows, 0);
    }

    #[test]
    fn test_winner_as_normal_row() {
        // Winner given as a standalone tab row instead of embedded
        let mut text = String::from("2023年 サラ系3歳オープン 芝1600m 晴 良 2頭\n1/13\n1回中京5日目\n");
        text.push_str(&loser_fields(1, 5));
        text.push('\n');
        text.push_str(&loser_fields(2, 3));
        text.push('\n');

        let outcome = parse_text(&text, &ParseOptions::new("シンザン記念", "G3"));
        assert_eq!(outcome.races.len(), 1);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].finish_position, Some(1));
    }

    #[test]
    fn test_block_without_date_discarded_whole() {
        let mut text = String::from("2023年 サラ系3歳オープン 芝1600m 晴 良 16頭\n");
        text.push_str(&loser_fields(2, 7));
        text.push('\n');

        let outcome = parse_text(&text, &ParseOptions::new("シンザン記念", "G3"));
        assert!(outcome.races.is_empty());
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.skipped_blocks, 1);
    }

    #[test]
    fn test_short_rows_counted_not_fatal() {
        let mut text = String::from("2023年 サラ系3歳オープン 芝1600m 晴 良 2頭\n1/13\n1回中京5日目\n");
        text.push_str(&loser_fields(1, 5));
        text.push('\n');
        text.push_str("2\t3\tホース\t牡3\n"); // far below minimum
        text.push('\n');

        let outcome = parse_text(&text, &ParseOptions::new("シンザン記念", "G3"));
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.skipped_rows, 1);
    }

    #[test]
    fn test_multiple_blocks_and_statistics() {
        let mut text = String::new();
        for (year, day) in [(2023, 13), (2022, 9)] {
            text.push_str(&format!(
                "{}年 サラ系3歳オープン 芝1600m 晴 良 2頭\n1/{}\n",
                year, day
            ));
            text.push_str(&format!("1回中京5日目\t{}\n", winner_fields()));
            text.push_str(&loser_fields(2, 3));
            text.push_str("\n\n");
        }
        text.push_str("データ分析\n人気データ\n");
        text.push_str("条件\t総数\t勝\t2着\t3着\t勝率\t連対率\t複勝率\n");
        text.push_str("1人気\t10\t3\t2\t1\t30.0\t50.0\t60.0\n");

        let outcome = parse_text(&text, &ParseOptions::new("シンザン記念", "G3"));
        assert_eq!(outcome.races.len(), 2);
        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.statistics.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let outcome = parse_text("", &ParseOptions::new("シンザン記念", "G3"));
        assert!(outcome.races.is_empty());
        assert!(outcome.results.is_empty());
        assert!(outcome.statistics.is_empty());
    }
}
