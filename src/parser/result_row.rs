//! Tab-delimited result row parsing.
//!
//! The source renders the winner differently from every other finisher:
//! normal rows lead with an explicit finish position, while the winner's
//! row (often embedded in the day-count header line) omits it and may or
//! may not carry a leading gate column. Layout selection is explicit via
//! `WinnerLayout` rather than ad-hoc offset arithmetic.

use tracing::debug;

use super::fields;
use crate::types::RaceResult;

/// Minimum tab-field count for a non-winner row.
pub const MIN_FIELDS_NON_WINNER: usize = 12;

/// Minimum tab-field count for a winner row.
pub const MIN_FIELDS_WINNER: usize = 11;

/// Null-safe access over the tab fields of one row.
///
/// Out-of-range indexes and empty fields both read as None, so mapping
/// code never has to guard lengths.
struct FieldMap<'a> {
    fields: Vec<&'a str>,
}

impl<'a> FieldMap<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            fields: line.split('\t').map(str::trim).collect(),
        }
    }

    fn len(&self) -> usize {
        self.fields.len()
    }

    fn get(&self, idx: usize) -> Option<&'a str> {
        match self.fields.get(idx) {
            Some(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    fn get_string(&self, idx: usize) -> Option<String> {
        self.get(idx).map(str::to_string)
    }
}

/// The two winner-row variants the source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerLayout {
    /// Leading gate column: "5\tホース名\t牡3\t..."
    WithGate,
    /// No gate column; every offset shifts down by one.
    NoGate,
}

impl WinnerLayout {
    /// Detection predicate: a first field that parses as an integer is a
    /// gate number, anything else is the horse name.
    fn detect(row: &FieldMap<'_>) -> Self {
        match row.get(0).and_then(fields::parse_u8) {
            Some(_) => WinnerLayout::WithGate,
            None => WinnerLayout::NoGate,
        }
    }

    /// Offset of the horse-name field; later fields follow in fixed order.
    fn base(&self) -> usize {
        match self {
            WinnerLayout::WithGate => 1,
            WinnerLayout::NoGate => 0,
        }
    }
}

/// Parse a non-winner row: explicit finish position, then gate.
///
/// Rows below the minimum field count are skipped (None), never fatal.
pub fn parse_result_row(line: &str) -> Option<RaceResult> {
    let row = FieldMap::new(line);
    if row.len() < MIN_FIELDS_NON_WINNER {
        debug!(
            fields = row.len(),
            min = MIN_FIELDS_NON_WINNER,
            "skipping short result row"
        );
        return None;
    }

    let mut result = RaceResult {
        finish_position: row.get(0).and_then(fields::parse_u8),
        post_position: row.get(1).and_then(fields::parse_u8),
        ..Default::default()
    };
    fill_common(&mut result, &row, 2);
    Some(result)
}

/// Parse a winner row: finish position 1 is implicit.
pub fn parse_winner_row(line: &str) -> Option<RaceResult> {
    let row = FieldMap::new(line);
    if row.len() < MIN_FIELDS_WINNER {
        debug!(
            fields = row.len(),
            min = MIN_FIELDS_WINNER,
            "skipping short winner row"
        );
        return None;
    }

    let layout = WinnerLayout::detect(&row);
    let mut result = RaceResult {
        finish_position: Some(1),
        post_position: match layout {
            WinnerLayout::WithGate => row.get(0).and_then(fields::parse_u8),
            WinnerLayout::NoGate => None,
        },
        ..Default::default()
    };
    fill_common(&mut result, &row, layout.base());
    Some(result)
}

/// Map the shared tail of both layouts, starting at the horse-name field.
fn fill_common(result: &mut RaceResult, row: &FieldMap<'_>, base: usize) {
    result.horse_name = row.get_string(base).unwrap_or_default();

    let (sex, age) = row
        .get(base + 1)
        .map(fields::split_age_sex)
        .unwrap_or((None, None));
    result.horse_sex = sex;
    result.horse_age = age;

    result.popularity = row.get(base + 2).and_then(fields::parse_u8);
    result.jockey_name = row.get_string(base + 3);
    result.jockey_weight = row.get(base + 4).and_then(fields::parse_f64);
    result.trainer_name = row.get_string(base + 5);

    result.finish_time_raw = row.get_string(base + 6);
    result.finish_time_secs = row.get(base + 6).and_then(fields::parse_finish_time);
    result.last_3f = row.get(base + 7).and_then(fields::parse_f64);

    let (weight, change) = row
        .get(base + 8)
        .map(fields::parse_horse_weight)
        .unwrap_or((None, None));
    result.horse_weight = weight;
    result.weight_change = change;

    result.passing_positions = row.get_string(base + 9);
    result.running_style = row
        .get(base + 9)
        .and_then(fields::running_style_from_passing);

    result.sire = row.get_string(base + 10);
    result.broodmare_sire = row.get_string(base + 11);
    result.previous_race = row.get_string(base + 12);
    result.days_since_last_run = row.get(base + 13).and_then(fields::parse_interval_days);
    result.previous_popularity = row.get(base + 14).and_then(fields::parse_u8);
    result.previous_finish_position = row.get(base + 15).and_then(fields::parse_u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunningStyle;

    fn non_winner_line() -> String {
        [
            "2",            // finish
            "7",            // gate
            "スピードホース", // horse
            "牡3",          // age/sex
            "3",            // popularity
            "武豊",          // jockey
            "56.0",         // jockey weight
            "友道康夫",      // trainer
            "1:34.0",       // time
            "34.5",         // last 3f
            "480(+4)",      // body weight
            "⑤④③",        // passing
            "ディープインパクト", // sire
            "キングカメハメハ",   // broodmare sire
            "朝日杯FS",      // previous race
            "8週",          // interval
            "2",            // previous popularity
            "4",            // previous finish
        ]
        .join("\t")
    }

    fn winner_line_with_gate() -> String {
        [
            "5",            // gate
            "ライトクオンタム", // horse
            "牝3",
            "1",
            "武豊",
            "56.0",
            "友道康夫",
            "1:33.8",
            "34.1",
            "466(-2)",
            "⑧⑦⑤",
            "ディープインパクト",
            "シンボリクリスエス",
            "新馬",
            "4週",
            "1",
            "1",
        ]
        .join("\t")
    }

    #[test]
    fn test_parse_non_winner_row() {
        let result = parse_result_row(&non_winner_line()).unwrap();
        assert_eq!(result.finish_position, Some(2));
        assert_eq!(result.post_position, Some(7));
        assert_eq!(result.horse_name, "スピードホース");
        assert_eq!(result.horse_sex.as_deref(), Some("牡"));
        assert_eq!(result.horse_age, Some(3));
        assert_eq!(result.popularity, Some(3));
        assert_eq!(result.jockey_weight, Some(56.0));
        assert_eq!(result.finish_time_raw.as_deref(), Some("1:34.0"));
        assert_eq!(result.finish_time_secs, Some(94.0));
        assert_eq!(result.last_3f, Some(34.5));
        assert_eq!(result.horse_weight, Some(480));
        assert_eq!(result.weight_change, Some(4));
        assert_eq!(result.running_style, Some(RunningStyle::Stalker));
        assert_eq!(result.days_since_last_run, Some(56));
        assert_eq!(result.previous_popularity, Some(2));
        assert_eq!(result.previous_finish_position, Some(4));
    }

    #[test]
    fn test_parse_winner_row_with_gate() {
        let result = parse_winner_row(&winner_line_with_gate()).unwrap();
        assert_eq!(result.finish_position, Some(1));
        assert_eq!(result.post_position, Some(5));
        assert_eq!(result.horse_name, "ライトクオンタム");
        assert_eq!(result.popularity, Some(1));
        assert_eq!(result.running_style, Some(RunningStyle::MidPackCloser));
    }

    #[test]
    fn test_parse_winner_row_without_gate() {
        // Drop the leading gate field; detection shifts every offset
        let line = winner_line_with_gate()
            .splitn(2, '\t')
            .nth(1)
            .unwrap()
            .to_string();
        let result = parse_winner_row(&line).unwrap();
        assert_eq!(result.finish_position, Some(1));
        assert_eq!(result.post_position, None);
        assert_eq!(result.horse_name, "ライトクオンタム");
        assert_eq!(result.horse_age, Some(3));
        assert_eq!(result.finish_time_secs, Some(93.8));
    }

    #[test]
    fn test_minimum_field_boundaries() {
        // Exactly 12 fields parses
        let line = non_winner_line()
            .split('\t')
            .take(MIN_FIELDS_NON_WINNER)
            .collect::<Vec<_>>()
            .join("\t");
        assert!(parse_result_row(&line).is_some());

        // One fewer is skipped
        let line = non_winner_line()
            .split('\t')
            .take(MIN_FIELDS_NON_WINNER - 1)
            .collect::<Vec<_>>()
            .join("\t");
        assert!(parse_result_row(&line).is_none());

        // Same for the winner layout at 11
        let line = winner_line_with_gate()
            .split('\t')
            .take(MIN_FIELDS_WINNER)
            .collect::<Vec<_>>()
            .join("\t");
        assert!(parse_winner_row(&line).is_some());

        let line = winner_line_with_gate()
            .split('\t')
            .take(MIN_FIELDS_WINNER - 1)
            .collect::<Vec<_>>()
            .join("\t");
        assert!(parse_winner_row(&line).is_none());
    }

    #[test]
    fn test_unparsable_fields_become_none() {
        let mut parts: Vec<String> = non_winner_line()
            .split('\t')
            .map(str::to_string)
            .collect();
        parts[0] = "取消".to_string(); // scratched
        parts[3] = "??".to_string(); // bad age/sex
        parts[8] = "".to_string(); // missing time
        parts[10] = "計不".to_string(); // weight not measured
        let result = parse_result_row(&parts.join("\t")).unwrap();
        assert_eq!(result.finish_position, None);
        assert_eq!(result.horse_sex, None);
        assert_eq!(result.horse_age, None);
        assert_eq!(result.finish_time_secs, None);
        assert_eq!(result.horse_weight, None);
        assert_eq!(result.weight_change, None);
        // The rest of the row survives
        assert_eq!(result.horse_name, "スピードホース");
        assert_eq!(result.popularity, Some(3));
    }
}
