//! keibalab-import
//!
//! CLI for importing keibalab-style race result text exports into a
//! per-schema SQLite store.

mod cli;
mod config;
mod importer;
mod parser;
mod storage;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Import {
            input,
            race_name,
            grade,
            years,
            schema,
            dry_run,
            format,
        } => match cli::run_import(input, race_name, grade, years, schema, dry_run, format) {
            Ok(_) => Ok(()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(cli::exit_code(&e));
            }
        },
        Commands::Stats {
            race_name,
            category,
            schema,
        } => cli::run_stats(race_name, category, schema),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "keibalab_import=trace"
    } else {
        "keibalab_import=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
