#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seeds placed neighborhoods from a tuple dump into the `DuckDB` store.
//!
//! [`seed`] wires every stage together: alias table resolution, record
//! extraction, district grouping, boundary lookup, placement, and the
//! idempotent upsert pass.

pub mod config;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use district_seed_database::DbError;
use district_seed_database::boundaries_db;
use district_seed_database::neighborhoods_db::DuckDbStore;
use district_seed_neighborhood::NeighborhoodError;
use district_seed_neighborhood::aliases::resolve_alias_table;
use district_seed_neighborhood::extract::extract_records;
use district_seed_neighborhood::group::group_by_district;
use district_seed_neighborhood::normalize::{AliasTable, DistrictNormalizer};
use district_seed_neighborhood::persist::{PersistReport, persist};
use district_seed_neighborhood::placement::place_all;
use district_seed_neighborhood::progress::ProgressCallback;
use duckdb::Connection;
use serde::Serialize;
use thiserror::Error;

pub use config::SeedConfig;

/// Errors that abort a seeding run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Alias table could not be loaded.
    #[error(transparent)]
    Neighborhood(#[from] NeighborhoodError),

    /// Boundary lookup, upsert, or commit failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Reading the input dump or config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`SeedConfig`].
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A config value is out of range.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// Description of the offending value.
        message: String,
    },
}

/// Everything a seeding run observed, from scan to leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Region the run extracted.
    pub region: String,
    /// Records extracted for the region.
    pub records: u64,
    /// Well-formed tuples for other regions.
    pub foreign_region: u64,
    /// Candidates without the tuple shape.
    pub malformed: u64,
    /// Distinct canonical districts seen in the input.
    pub districts: u64,
    /// Districts available in the boundary lookup.
    pub boundaries: u64,
    /// Persistence counters and leaderboard.
    pub report: PersistReport,
}

/// Runs the full pipeline over `text` against an open database.
///
/// # Errors
///
/// Returns [`IngestError`] if the config is invalid, the alias table or
/// boundary lookup cannot be loaded, or the upsert transaction fails to
/// open or commit. Per-row failures and unmatched districts are counted in
/// the returned [`SeedSummary`] instead.
pub fn seed(
    conn: &Connection,
    text: &str,
    config: &SeedConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<SeedSummary, IngestError> {
    config.validate()?;
    let start = Instant::now();

    let alias_def = resolve_alias_table(&config.aliases)?;
    if alias_def.region != config.region {
        log::warn!(
            "Alias table '{}' is for {} but seeding {}",
            alias_def.id,
            alias_def.region,
            config.region
        );
    }
    let normalizer = DistrictNormalizer::new(AliasTable::from_def(&alias_def)?);

    let extraction = extract_records(text, &config.region);
    let records = extraction.records.len() as u64;

    let groups = group_by_district(extraction.records, &normalizer, config.district_field);

    let lookup = boundaries_db::load_lookup(conn, &config.region)?;
    if lookup.is_empty() {
        log::warn!(
            "No district boundaries for {}; every neighborhood will be skipped",
            config.region
        );
    }

    let placement = place_all(&groups, &lookup, config.margin);

    let mut store = DuckDbStore::new(conn);
    let report = persist(&mut store, &placement, config.leaderboard_size, progress)?;

    log::info!(
        "Seeded {} in {:.1}s",
        config.region,
        start.elapsed().as_secs_f64()
    );

    Ok(SeedSummary {
        region: config.region.clone(),
        records,
        foreign_region: extraction.foreign_region,
        malformed: extraction.malformed,
        districts: groups.len() as u64,
        boundaries: lookup.len() as u64,
        report,
    })
}

/// Reads `path` and runs [`seed`] over its contents.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the file cannot be read, otherwise as
/// [`seed`].
pub fn seed_file(
    conn: &Connection,
    path: &Path,
    config: &SeedConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<SeedSummary, IngestError> {
    log::info!("Reading {}", path.display());
    let text = std::fs::read_to_string(path)?;
    seed(conn, &text, config, progress)
}
