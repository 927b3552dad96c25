//! Derived-field computers and safe numeric coercions.
//!
//! Every function here follows the same contract: input that is empty or
//! outside the expected shape yields None, never a panic or an error. Rows
//! with a few bad fields are still worth keeping.

use regex::Regex;

use crate::types::RunningStyle;

/// Circled-numeral glyphs used for corner passing order, index 0 = rank 1.
const CIRCLED_DIGITS: [char; 20] = [
    '①', '②', '③', '④', '⑤', '⑥', '⑦', '⑧', '⑨', '⑩', '⑪', '⑫', '⑬', '⑭', '⑮', '⑯',
    '⑰', '⑱', '⑲', '⑳',
];

/// Map one circled-numeral glyph to its rank.
fn circled_to_rank(c: char) -> Option<u8> {
    CIRCLED_DIGITS
        .iter()
        .position(|&d| d == c)
        .map(|i| (i + 1) as u8)
}

/// Extract corner ranks from a passing-position string like "⑤④③①".
///
/// Non-glyph characters (separators, stray text) are ignored.
pub fn passing_positions(s: &str) -> Vec<u8> {
    s.chars().filter_map(circled_to_rank).collect()
}

/// Classify a corner-rank sequence into a running style.
///
/// Leading at every one of the last three recorded corners (or all of
/// them, when fewer than three exist) counts as a front-runner; otherwise
/// the final corner rank decides the band. An empty sequence is None.
pub fn estimate_running_style(positions: &[u8]) -> Option<RunningStyle> {
    if positions.is_empty() {
        return None;
    }

    let tail_start = positions.len().saturating_sub(3);
    let tail = &positions[tail_start..];
    if tail.iter().all(|&p| p == 1) {
        return Some(RunningStyle::FrontRunner);
    }

    let last = *positions.last()?;
    Some(match last {
        1..=5 => RunningStyle::Stalker,
        6..=10 => RunningStyle::MidPackCloser,
        _ => RunningStyle::FarCloser,
    })
}

/// Running style straight from the raw passing-position field.
pub fn running_style_from_passing(s: &str) -> Option<RunningStyle> {
    estimate_running_style(&passing_positions(s))
}

/// Parse a finish time: "1:33.4" (minutes:seconds) or bare seconds.
pub fn parse_finish_time(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some((min, sec)) = s.split_once(':') {
        let min: f64 = min.trim().parse().ok()?;
        let sec: f64 = sec.trim().parse().ok()?;
        return Some(min * 60.0 + sec);
    }
    s.parse().ok()
}

/// Parse a body-weight field: "480(+4)", "480(-2)", or bare "480".
///
/// Bare digits mean no change since the previous start. Anything else is
/// (None, None).
pub fn parse_horse_weight(s: &str) -> (Option<u32>, Option<i32>) {
    let re = Regex::new(r"^(\d+)\(([+-]?\d+)\)$").unwrap();
    let s = s.trim();
    if let Some(caps) = re.captures(s) {
        let weight = caps[1].parse().ok();
        let change = caps[2].parse().ok();
        return (weight, change);
    }
    if let Ok(weight) = s.parse::<u32>() {
        return (Some(weight), Some(0));
    }
    (None, None)
}

/// Parse an inter-race interval: "3週" (weeks) or "2ヶ月" (months).
///
/// Normalized to days; months are approximated at 30 days.
pub fn parse_interval_days(s: &str) -> Option<u32> {
    let re = Regex::new(r"^(\d+)(週|ヶ月)$").unwrap();
    let caps = re.captures(s.trim())?;
    let n: u32 = caps[1].parse().ok()?;
    match &caps[2] {
        "週" => Some(n * 7),
        "ヶ月" => Some(n * 30),
        _ => None,
    }
}

/// Split an age/sex field like "牡3" into (sex, age).
pub fn split_age_sex(s: &str) -> (Option<String>, Option<u8>) {
    let re = Regex::new(r"([牡牝セ])(\d+)").unwrap();
    match re.captures(s) {
        Some(caps) => (Some(caps[1].to_string()), caps[2].parse().ok()),
        None => (None, None),
    }
}

/// Coerce to u8, None on empty or unparsable input.
pub fn parse_u8(s: &str) -> Option<u8> {
    s.trim().parse().ok()
}

/// Coerce to u32, None on empty or unparsable input.
pub fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

/// Coerce to f64, None on empty or unparsable input.
pub fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}
