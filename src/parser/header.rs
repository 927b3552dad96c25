//! Race header block parsing.
//!
//! A block opens with a year-header line ("2023年 サラ系3歳オープン
//! 芝1600m 晴 良 16頭") followed by a short run of date/venue/day-count
//! lines. The day-count line sometimes carries the winner's tab-delimited
//! result row appended after the venue text; that segment is handed back
//! raw for the winner-row parser.

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use super::cursor::LineCursor;
use super::scanner::{classify, LineKind};
use crate::types::Race;

/// Weather literals, first match wins.
const WEATHER: [&str; 5] = ["小雨", "小雪", "晴", "曇", "雨"];

/// Track condition literals, most specific first so 重 never matches
/// inside 稍重 nor 良 inside 不良.
const TRACK_CONDITIONS: [&str; 4] = ["不良", "稍重", "重", "良"];

/// JRA racecourses recognized inside venue text.
const RACECOURSES: [&str; 10] = [
    "札幌", "函館", "福島", "新潟", "中山", "東京", "中京", "京都", "阪神", "小倉",
];

/// Parsed header block, not yet tied to an event name.
#[derive(Debug, Clone, Default)]
pub struct HeaderBlock {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub race_class: String,
    pub surface: String,
    pub distance: u32,
    pub track_condition: String,
    pub weather: String,
    pub num_horses: u32,
    pub race_venue: String,
    pub track_name: String,
    /// Raw tab-delimited winner row embedded in the day-count line.
    pub winner_row_raw: Option<String>,
}

impl HeaderBlock {
    /// Build the Race record once the event name and grade are known.
    ///
    /// None when the block never produced a full date.
    pub fn into_race(self, race_name: &str, grade: &str) -> Option<Race> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month?, self.day?)?;
        Some(Race {
            race_name: race_name.to_string(),
            race_date: date,
            race_venue: self.race_venue,
            track_name: self.track_name,
            distance: self.distance,
            surface: self.surface,
            track_condition: self.track_condition,
            weather: self.weather,
            grade: grade.to_string(),
            race_class: self.race_class,
            num_horses: self.num_horses,
        })
    }
}

/// How many lines past the year header may belong to the same header block.
pub const HEADER_LOOKAHEAD: usize = 5;

/// Parse the header block starting at the cursor's year-header line.
///
/// Consumes the year header plus any date/venue/day-count continuation
/// lines (bounded by `lookahead`). A header whose year does not parse is
/// a recoverable skip: None is returned with only the year line consumed.
pub fn parse_header_block(cursor: &mut LineCursor<'_>, lookahead: usize) -> Option<HeaderBlock> {
    let line = cursor.current()?;
    let line_number = cursor.line_number();

    let year_re = Regex::new(r"^(\d{4})年").unwrap();
    let Some(caps) = year_re.captures(line) else {
        warn!(line = line_number, "header block without a parsable year, dropping");
        cursor.advance();
        return None;
    };
    // The regex guarantees exactly four digits
    let year: i32 = caps[1].parse().unwrap_or(0);

    let mut block = HeaderBlock {
        year,
        ..Default::default()
    };

    let class_re = Regex::new(r"(サラ系\S+)").unwrap();
    if let Some(caps) = class_re.captures(line) {
        block.race_class = caps[1].to_string();
    }

    if let Some(w) = WEATHER.iter().find(|w| line.contains(**w)) {
        block.weather = w.to_string();
    }
    if let Some(c) = TRACK_CONDITIONS.iter().find(|c| line.contains(**c)) {
        block.track_condition = c.to_string();
    }

    let dist_re = Regex::new(r"(芝|ダート|ダ)(\d+)m").unwrap();
    if let Some(caps) = dist_re.captures(line) {
        block.surface = caps[1].to_string();
        block.distance = caps[2].parse().unwrap_or(0);
    }

    let horses_re = Regex::new(r"(\d+)頭").unwrap();
    if let Some(caps) = horses_re.captures(line) {
        block.num_horses = caps[1].parse().unwrap_or(0);
    }

    cursor.advance();

    // Continuation lines: date, venue fragments, day count. The day-count
    // line closes the header.
    let date_re = Regex::new(r"^(\d{1,2})/(\d{1,2})$").unwrap();
    for _ in 0..lookahead {
        let Some(line) = cursor.current() else { break };
        match classify(line) {
            LineKind::DateMarker => {
                if let Some(caps) = date_re.captures(line.trim()) {
                    block.month = caps[1].parse().ok();
                    block.day = caps[2].parse().ok();
                }
                cursor.advance();
            }
            LineKind::VenueMarker => {
                block.race_venue.push_str(line.trim());
                cursor.advance();
            }
            LineKind::DayCountMarker => {
                // Venue text before the first tab, winner row after it.
                let (venue_part, winner_part) = match line.split_once('\t') {
                    Some((v, w)) => (v, Some(w)),
                    None => (line, None),
                };
                block.race_venue.push_str(venue_part.trim());
                if let Some(raw) = winner_part {
                    debug!(line = cursor.line_number(), "winner row embedded in day-count line");
                    block.winner_row_raw = Some(raw.to_string());
                }
                cursor.advance();
                break;
            }
            _ => break,
        }
    }

    if let Some(course) = RACECOURSES.iter().find(|c| block.race_venue.contains(**c)) {
        block.track_name = course.to_string();
    }

    Some(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<HeaderBlock> {
        let mut cursor = LineCursor::new(text);
        parse_header_block(&mut cursor, HEADER_LOOKAHEAD)
    }

    #[test]
    fn test_parse_full_header() {
        let block = parse(
            "2023年 サラ系3歳オープン 芝1600m 晴 良 16頭\n1/13\n1回中京5日目",
        )
        .unwrap();
        assert_eq!(block.year, 2023);
        assert_eq!(block.race_class, "サラ系3歳オープン");
        assert_eq!(block.surface, "芝");
        assert_eq!(block.distance, 1600);
        assert_eq!(block.weather, "晴");
        assert_eq!(block.track_condition, "良");
        assert_eq!(block.num_horses, 16);
        assert_eq!(block.month, Some(1));
        assert_eq!(block.day, Some(13));
        assert_eq!(block.race_venue, "1回中京5日目");
        assert_eq!(block.track_name, "中京");
        assert!(block.winner_row_raw.is_none());
    }

    #[test]
    fn test_track_condition_specificity() {
        let block = parse("2022年 サラ系3歳オープン 芝1600m 曇 稍重 15頭").unwrap();
        assert_eq!(block.track_condition, "稍重");

        let block = parse("2022年 サラ系3歳オープン ダ1800m 雨 不良 12頭").unwrap();
        assert_eq!(block.track_condition, "不良");
        assert_eq!(block.surface, "ダ");
        assert_eq!(block.distance, 1800);
    }

    #[test]
    fn test_embedded_winner_row_extracted() {
        let block = parse(
            "2023年 サラ系3歳オープン 芝1600m 晴 良 16頭\n1/13\n1回中京5日目\t5\tライトクオンタム\t牝3",
        )
        .unwrap();
        assert_eq!(block.race_venue, "1回中京5日目");
        assert_eq!(
            block.winner_row_raw.as_deref(),
            Some("5\tライトクオンタム\t牝3")
        );
    }

    #[test]
    fn test_venue_fragments_concatenated() {
        let block = parse(
            "2021年 サラ系3歳オープン 芝1600m 晴 良 14頭\n1/11\n1回京都\n4日目",
        )
        .unwrap();
        assert_eq!(block.race_venue, "1回京都4日目");
        assert_eq!(block.track_name, "京都");
    }

    #[test]
    fn test_year_missing_drops_block() {
        let mut cursor = LineCursor::new("年不明 サラ系3歳オープン\n1/13");
        // Not classified as a year header at all; treated as unparsable
        assert!(parse_header_block(&mut cursor, HEADER_LOOKAHEAD).is_none());
        // The offending line was consumed so scanning can resume
        assert_eq!(cursor.current(), Some("1/13"));
    }

    #[test]
    fn test_into_race_requires_date() {
        let block = parse("2023年 サラ系3歳オープン 芝1600m 晴 良 16頭").unwrap();
        assert!(block.into_race("シンザン記念", "G3").is_none());

        let block = parse(
            "2023年 サラ系3歳オープン 芝1600m 晴 良 16頭\n1/13\n1回中京5日目",
        )
        .unwrap();
        let race = block.into_race("シンザン記念", "G3").unwrap();
        assert_eq!(race.race_date, NaiveDate::from_ymd_opt(2023, 1, 13).unwrap());
        assert_eq!(race.race_name, "シンザン記念");
        assert_eq!(race.grade, "G3");
    }

    #[test]
    fn test_end_of_input_mid_block() {
        // Header then EOF: block finalized with what was accumulated
        let block = parse("2023年 サラ系3歳オープン 芝1600m 晴 良 16頭\n1/13").unwrap();
        assert_eq!(block.month, Some(1));
        assert!(block.race_venue.is_empty());
    }
}
