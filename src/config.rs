//! Configuration for the importer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding one SQLite file per schema namespace.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Import tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Max continuation lines a race header block may span.
    #[serde(default = "default_header_lookahead")]
    pub header_lookahead: usize,
    /// Assumed sample size for rates-only popularity tables.
    #[serde(default = "default_popularity_sample")]
    pub popularity_sample: u32,
    /// Assumed sample size for rates-only gate tables.
    #[serde(default = "default_post_position_sample")]
    pub post_position_sample: u32,
}

fn default_header_lookahead() -> usize {
    5
}

fn default_popularity_sample() -> u32 {
    10
}

fn default_post_position_sample() -> u32 {
    20
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            header_lookahead: default_header_lookahead(),
            popularity_sample: default_popularity_sample(),
            post_position_sample: default_post_position_sample(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file, and the
    /// environment. Field names contain underscores, so the nesting
    /// separator is doubled: KEIBA_DATABASE__DATA_DIR,
    /// KEIBA_IMPORT__POPULARITY_SAMPLE, etc.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("KEIBA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Database file for a schema namespace: one file per namespace.
    pub fn db_path(&self, schema: &str) -> PathBuf {
        PathBuf::from(&self.data_dir()).join(format!("{}.db", schema))
    }

    fn data_dir(&self) -> &str {
        &self.database.data_dir
    }
}
