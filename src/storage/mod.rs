//! SQLite storage module for imported race data.
//!
//! Provides transactional, natural-key upsert persistence for races,
//! per-horse results, and aggregated statistics.

pub mod repository;
pub mod schema;

pub use repository::{EliminationStat, RaceRepository, WriteCounts};
pub use schema::create_tables;
