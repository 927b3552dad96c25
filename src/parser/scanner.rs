//! Line classification for keibalab text exports.
//!
//! Each raw line maps to exactly one `LineKind`; the orchestrator in the
//! parent module drives block segmentation off these kinds.

use regex::Regex;

use crate::types::StatCategory;

/// Fixed token opening the aggregated-statistics section of an export.
pub const STATS_SECTION_TOKEN: &str = "データ分析";

/// Required token in a statistics table header line.
pub const STATS_HEADER_TOKEN: &str = "勝率";

/// Classification of one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// "2023年 サラ系3歳オープン 芝1600m 晴 良 16頭"
    YearHeader,
    /// "1/13"
    DateMarker,
    /// "1回中京" (venue fragment, may continue over several lines)
    VenueMarker,
    /// "5日目", possibly with the winner's tab-delimited row appended.
    DayCountMarker,
    /// Exact statistics-section opener.
    StatsSection,
    /// "枠順データ" / "人気データ" table opener.
    CategoryHeader(StatCategory),
    /// Category tables we deliberately do not import (年齢, 所属, ...).
    SkippedCategory,
    /// Tab-delimited data row (result row or statistics row).
    TabularRow,
    /// Block terminator.
    Blank,
    /// Anything else (free text, column headers without tabs).
    Other,
}

/// Classify one trimmed source line.
pub fn classify(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if line == STATS_SECTION_TOKEN {
        return LineKind::StatsSection;
    }

    let year_re = Regex::new(r"^\d{4}年").unwrap();
    if year_re.is_match(line) {
        return LineKind::YearHeader;
    }

    let date_re = Regex::new(r"^\d{1,2}/\d{1,2}$").unwrap();
    if date_re.is_match(line) {
        return LineKind::DateMarker;
    }

    let day_count_re = Regex::new(r"^\d+日目").unwrap();
    if day_count_re.is_match(line) {
        return LineKind::DayCountMarker;
    }

    let venue_re = Regex::new(r"^\d+回").unwrap();
    if venue_re.is_match(line) {
        // "1回中京5日目" carries both markers; day count wins so the
        // embedded winner row is not lost.
        if line.contains("日目") {
            return LineKind::DayCountMarker;
        }
        return LineKind::VenueMarker;
    }

    if line.starts_with("枠順") {
        return LineKind::CategoryHeader(StatCategory::PostPosition);
    }
    if line.starts_with("人気") {
        return LineKind::CategoryHeader(StatCategory::Popularity);
    }
    if line.starts_with("年齢") || line.starts_with("所属") || line.starts_with("脚質") {
        return LineKind::SkippedCategory;
    }

    if line.contains('\t') {
        return LineKind::TabularRow;
    }

    LineKind::Other
}
