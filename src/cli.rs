//! CLI commands for keibalab-import.
//!
//! `import` parses one text export and persists it; `stats` reads back
//! the persisted aggregates plus the live running-style distribution.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::importer::{self, ImportError, ImportSummary};
use crate::parser::statistics::AssumedSamples;
use crate::parser::ParseOptions;
use crate::storage::{EliminationStat, RaceRepository};
use crate::types::{ConfidenceTier, StatCategory};

#[derive(Parser)]
#[command(name = "keibalab-import")]
#[command(version, about = "Import keibalab race result text exports into SQLite", long_about = None)]
pub struct Cli {
    /// Emit per-line classification and field extraction tracing
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a text export and import it
    Import {
        /// Path to the text export
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Event name shared by every race block in the file
        #[arg(short, long)]
        race_name: String,

        /// Grade label
        #[arg(short, long, default_value = "G3")]
        grade: String,

        /// Years the aggregates cover
        #[arg(short, long, default_value_t = 10)]
        years: u32,

        /// Schema namespace (one database file per namespace)
        #[arg(short, long, default_value = "horse_racing")]
        schema: String,

        /// Parse and report counts only, write nothing
        #[arg(long)]
        dry_run: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show persisted statistics for an event
    Stats {
        /// Event name
        #[arg(short, long)]
        race_name: String,

        /// Category (popularity, post_position)
        #[arg(short, long, default_value = "popularity")]
        category: String,

        /// Schema namespace
        #[arg(short, long, default_value = "horse_racing")]
        schema: String,
    },
}

/// Exit codes distinguishing operator problems: bad path, bad format,
/// storage trouble, bad configuration.
pub fn exit_code(err: &ImportError) -> i32 {
    match err {
        ImportError::InputNotFound(_) | ImportError::InputUnreadable { .. } => 2,
        ImportError::NoRecords(_) => 3,
        ImportError::Storage(_) => 4,
        ImportError::Config(_) => 5,
    }
}

/// Run the import command.
pub fn run_import(
    input: PathBuf,
    race_name: String,
    grade: String,
    years: u32,
    schema: String,
    dry_run: bool,
    format: String,
) -> Result<ImportSummary, ImportError> {
    let config = AppConfig::load().map_err(ImportError::Config)?;

    let mut opts = ParseOptions::new(race_name.clone(), grade);
    opts.years_analyzed = years;
    opts.header_lookahead = config.import.header_lookahead;
    opts.assumed_samples = AssumedSamples {
        popularity: config.import.popularity_sample,
        post_position: config.import.post_position_sample,
    };

    let outcome = importer::parse_file(&input, &opts)?;

    let summary = if dry_run {
        importer::dry_run_summary(&outcome, &race_name)
    } else {
        let mut repo = RaceRepository::new(&config.db_path(&schema))?;
        importer::import_outcome(outcome, &mut repo, &race_name)?
    };

    match format.as_str() {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&summary)
                .map_err(|e| ImportError::Storage(e.into()))?
        ),
        _ => print_summary(&summary),
    }
    Ok(summary)
}

fn print_summary(summary: &ImportSummary) {
    println!("Race: {}", summary.race_name);
    if summary.dry_run {
        println!("(dry run, nothing written)");
    }
    println!(
        "Parsed: {} races, {} results, {} statistics",
        summary.races_parsed, summary.results_parsed, summary.statistics_parsed
    );
    if summary.skipped_blocks > 0 || summary.skipped_rows > 0 {
        println!(
            "Skipped: {} blocks, {} rows",
            summary.skipped_blocks, summary.skipped_rows
        );
    }
    if let Some(written) = &summary.written {
        println!(
            "Written: {} races, {} results, {} statistics",
            written.races, written.results, written.statistics
        );
    }
    if let Some(v) = &summary.verification {
        println!();
        println!("=== Store verification ===");
        println!(
            "  races: {}, results: {}, statistics: {}",
            v.races_in_store, v.results_in_store, v.statistics_in_store
        );
        println!("  running styles ({} confidence):", v.confidence);
        for s in &v.running_styles {
            println!("    {:>4}: {}", s.style, s.count);
        }
    }
}

/// Run the stats command.
pub fn run_stats(race_name: String, category: String, schema: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let repo = RaceRepository::new(&config.db_path(&schema))?;

    let Some(category) = StatCategory::from_str_label(&category) else {
        anyhow::bail!("unknown category: {} (expected popularity or post_position)", category);
    };

    let stats = repo.get_statistics(&race_name, category)?;
    if stats.is_empty() {
        println!("No statistics for {} / {}", race_name, category);
    } else {
        println!("=== {} / {} ===", race_name, category);
        for s in &stats {
            let flag = if s.counts_estimated { " (estimated)" } else { "" };
            println!(
                "  {:<10} {:>3}走 {:>2}-{:>2}-{:>2} 勝率{:>5.1}% 連対率{:>5.1}% 複勝率{:>5.1}%{}",
                s.condition,
                s.total_runs,
                s.wins,
                s.seconds,
                s.places,
                s.win_rate,
                s.place_rate,
                s.show_rate,
                flag
            );
        }
    }

    let distribution = repo.running_style_distribution(&race_name)?;
    let sample: u32 = distribution.iter().map(|(_, c)| c).sum();
    if sample > 0 {
        println!();
        println!(
            "=== Running styles (live, {} confidence) ===",
            ConfidenceTier::from_sample_size(sample)
        );
        for (style, count) in &distribution {
            println!("  {:>4}: {}", style, count);
        }
    }

    print_breakdown(
        "Previous-start popularity (live)",
        &repo.previous_popularity_breakdown(&race_name)?,
    );
    print_breakdown(
        "Previous-start finish (live)",
        &repo.previous_finish_breakdown(&race_name)?,
    );

    Ok(())
}

fn print_breakdown(title: &str, buckets: &[EliminationStat]) {
    if buckets.is_empty() {
        return;
    }
    println!();
    println!("=== {} ===", title);
    for b in buckets {
        println!(
            "  {:<12} {:>3}走 {:>2}勝 {:>2}複 勝率{:>5.1}% 複勝率{:>5.1}%",
            b.condition, b.total, b.wins, b.places, b.win_rate, b.place_rate
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_error_class() {
        let path = PathBuf::from("missing.txt");
        assert_eq!(exit_code(&ImportError::InputNotFound(path.clone())), 2);
        assert_eq!(exit_code(&ImportError::NoRecords(path)), 3);
        assert_eq!(
            exit_code(&ImportError::Storage(anyhow::anyhow!("disk full"))),
            4
        );
        assert_eq!(
            exit_code(&ImportError::Config(anyhow::anyhow!("bad config.toml"))),
            5
        );
    }
}
