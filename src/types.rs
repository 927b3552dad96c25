//! Core record types produced by the parser and persisted by the importer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One historical running of a named race.
///
/// Uniquely identified by (race_name, race_date); the same event name
/// recurs once per year in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    pub race_name: String,
    pub race_date: NaiveDate,
    pub race_venue: String,
    pub track_name: String,
    pub distance: u32,
    pub surface: String,
    pub track_condition: String,
    pub weather: String,
    pub grade: String,
    pub race_class: String,
    pub num_horses: u32,
}

/// One horse's finishing record within a race.
///
/// Nearly every field is optional: the source rows are hand-exported and
/// any individual field may be missing or unparsable without invalidating
/// the rest of the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceResult {
    /// 1-based finish rank; None when scratched or unclassified.
    pub finish_position: Option<u8>,
    pub post_position: Option<u8>,
    pub horse_name: String,
    pub horse_age: Option<u8>,
    pub horse_sex: Option<String>,
    pub popularity: Option<u8>,
    pub jockey_name: Option<String>,
    pub jockey_weight: Option<f64>,
    pub trainer_name: Option<String>,
    /// Finish time as printed in the source, e.g. "1:33.4".
    pub finish_time_raw: Option<String>,
    pub finish_time_secs: Option<f64>,
    pub last_3f: Option<f64>,
    pub horse_weight: Option<u32>,
    pub weight_change: Option<i32>,
    /// Corner passing order as printed (circled-numeral glyphs).
    pub passing_positions: Option<String>,
    pub running_style: Option<RunningStyle>,
    pub sire: Option<String>,
    pub broodmare_sire: Option<String>,
    pub previous_race: Option<String>,
    pub days_since_last_run: Option<u32>,
    pub previous_popularity: Option<u8>,
    pub previous_finish_position: Option<u8>,
}

/// Derived race-position tendency, computed from corner passing order.
///
/// Never persisted as a precomputed aggregate; distributions over it are
/// always recomputed live from stored results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunningStyle {
    /// 逃げ: led at (up to) the last three corners.
    FrontRunner,
    /// 先行: final corner rank 1-5.
    Stalker,
    /// 差し: final corner rank 6-10.
    MidPackCloser,
    /// 追込: final corner rank 11+.
    FarCloser,
}

impl RunningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunningStyle::FrontRunner => "逃げ",
            RunningStyle::Stalker => "先行",
            RunningStyle::MidPackCloser => "差し",
            RunningStyle::FarCloser => "追込",
        }
    }

    pub fn from_str_label(s: &str) -> Option<Self> {
        match s {
            "逃げ" => Some(RunningStyle::FrontRunner),
            "先行" => Some(RunningStyle::Stalker),
            "差し" => Some(RunningStyle::MidPackCloser),
            "追込" => Some(RunningStyle::FarCloser),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunningStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of an aggregated statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatCategory {
    Popularity,
    PostPosition,
}

impl StatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatCategory::Popularity => "popularity",
            StatCategory::PostPosition => "post_position",
        }
    }

    pub fn from_str_label(s: &str) -> Option<Self> {
        match s {
            "popularity" => Some(StatCategory::Popularity),
            "post_position" => Some(StatCategory::PostPosition),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated performance row for a race under one condition bucket.
///
/// Uniquely identified by (race_name, category, condition).
#[derive(Debug, Clone, PartialEq)]
pub struct RaceStatistic {
    pub race_name: String,
    pub category: StatCategory,
    /// Condition label as printed, e.g. "1人気" or "3" (gate 3).
    pub condition: String,
    pub total_runs: u32,
    pub wins: u32,
    pub seconds: u32,
    pub places: u32,
    pub win_rate: f64,
    pub place_rate: f64,
    pub show_rate: f64,
    pub years_analyzed: u32,
    /// True when counts were back-computed from rates and an assumed
    /// sample size rather than read from the source.
    pub counts_estimated: bool,
}

/// Qualitative reliability label for aggregates derived from small samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Tier for an aggregate covering `sample_size` runs.
    pub fn from_sample_size(sample_size: u32) -> Self {
        if sample_size < 100 {
            ConfidenceTier::Low
        } else if sample_size < 150 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
