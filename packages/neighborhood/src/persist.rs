//! Idempotent persistence of placed neighborhoods.
//!
//! Rows are upserted one at a time inside a single transaction keyed on
//! `(district, name)`. A conflict leaves the stored row untouched. A row
//! that fails validation or that the store rejects is logged, counted,
//! and skipped; only failures to begin, commit, or read back statistics
//! abort the run.

use std::sync::Arc;

use district_seed_neighborhood_models::{DistrictCount, Neighborhood};
use serde::Serialize;
use thiserror::Error;

use crate::placement::Placement;
use crate::progress::{ProgressCallback, null_progress};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row with the same `(district, name)` already existed and was left
    /// as-is.
    AlreadyPresent,
}

/// Storage backend for placed neighborhoods.
pub trait NeighborhoodStore {
    /// Store-specific error.
    type Error: std::error::Error;

    /// Opens the transaction that all upserts of one run share.
    ///
    /// # Errors
    ///
    /// Returns the store error if the transaction cannot be started.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Inserts `row` unless `(district, name)` already exists.
    ///
    /// # Errors
    ///
    /// Returns the store error if the row cannot be written. A failed row
    /// must not discard rows upserted earlier in the same run.
    fn upsert(&mut self, row: &Neighborhood) -> Result<UpsertOutcome, Self::Error>;

    /// Commits the run's transaction.
    ///
    /// # Errors
    ///
    /// Returns the store error if the commit fails or if earlier rows of
    /// the run can no longer be committed.
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Ensures a lookup index on the district column exists.
    ///
    /// # Errors
    ///
    /// Returns the store error if index creation fails.
    fn create_district_index(&mut self) -> Result<(), Self::Error>;

    /// Total rows currently stored.
    ///
    /// # Errors
    ///
    /// Returns the store error if the count query fails.
    fn row_count(&self) -> Result<u64, Self::Error>;

    /// Districts with the most stored rows, largest first, ties broken by
    /// district name.
    ///
    /// # Errors
    ///
    /// Returns the store error if the query fails.
    fn district_counts(&self, limit: usize) -> Result<Vec<DistrictCount>, Self::Error>;
}

/// Why a single row was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    /// District name is blank.
    #[error("empty district name")]
    EmptyDistrict,

    /// Neighborhood name is blank.
    #[error("empty neighborhood name")]
    EmptyName,

    /// Latitude or longitude is NaN or infinite.
    #[error("non-finite coordinate ({lat}, {lng})")]
    NonFiniteCoordinate {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },

    /// Postal code does not fit the 32-bit `INTEGER` column.
    #[error("zip code {0} does not fit in a 32-bit integer column")]
    ZipcodeOutOfRange(i64),

    /// The store rejected the row.
    #[error("store rejected row: {0}")]
    Store(String),
}

/// Checks a row against the persisted schema before it reaches the store.
///
/// # Errors
///
/// Returns the first [`RowError`] found.
pub fn validate(row: &Neighborhood) -> Result<(), RowError> {
    if row.district.trim().is_empty() {
        return Err(RowError::EmptyDistrict);
    }
    if row.name.trim().is_empty() {
        return Err(RowError::EmptyName);
    }
    if !row.lat.is_finite() || !row.lng.is_finite() {
        return Err(RowError::NonFiniteCoordinate {
            lat: row.lat,
            lng: row.lng,
        });
    }
    if let Some(zip) = row.zipcode {
        if i32::try_from(zip).is_err() {
            return Err(RowError::ZipcodeOutOfRange(zip));
        }
    }
    Ok(())
}

/// A skipped row and the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// District of the skipped row.
    pub district: String,
    /// Neighborhood name of the skipped row.
    pub name: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Summary of one persistence run.
///
/// `requested == inserted + already_present + skipped_unmatched +
/// skipped_failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    /// Neighborhoods handed to the run, including unmatched ones.
    pub requested: u64,
    /// Rows newly written.
    pub inserted: u64,
    /// Rows whose `(district, name)` was already stored.
    pub already_present: u64,
    /// Neighborhoods skipped because their district had no boundary.
    pub skipped_unmatched: u64,
    /// Rows skipped because of a row-level failure.
    pub skipped_failed: u64,
    /// Unmatched districts with their skipped counts.
    pub unmatched: Vec<DistrictCount>,
    /// Row-level failures.
    pub failures: Vec<RowFailure>,
    /// Rows in the table after the commit.
    pub table_rows: u64,
    /// Top districts by stored row count.
    pub leaderboard: Vec<DistrictCount>,
}

impl PersistReport {
    /// Rows that are now in the table because of, or despite, this run.
    #[must_use]
    pub const fn stored(&self) -> u64 {
        self.inserted + self.already_present
    }
}

/// Upserts every placed row, commits once, builds the district index, and
/// reports counts.
///
/// # Errors
///
/// Returns the store error if the transaction cannot be opened or
/// committed, or if the index or statistics queries fail. Row-level
/// failures are reported in [`PersistReport::failures`] instead.
pub fn persist<S: NeighborhoodStore>(
    store: &mut S,
    placement: &Placement,
    leaderboard_size: usize,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<PersistReport, S::Error> {
    let progress = progress.unwrap_or_else(null_progress);
    let skipped_unmatched = placement.skipped_unmatched();

    let mut report = PersistReport {
        requested: placement.rows.len() as u64 + skipped_unmatched,
        skipped_unmatched,
        unmatched: placement.unmatched.clone(),
        ..PersistReport::default()
    };

    progress.set_total(placement.rows.len() as u64);
    progress.set_message("Upserting neighborhoods".to_string());

    store.begin()?;

    for row in &placement.rows {
        let outcome = validate(row).and_then(|()| {
            store
                .upsert(row)
                .map_err(|e| RowError::Store(e.to_string()))
        });

        match outcome {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::AlreadyPresent) => report.already_present += 1,
            Err(e) => {
                log::warn!("Error inserting {}/{}: {e}", row.district, row.name);
                report.skipped_failed += 1;
                report.failures.push(RowFailure {
                    district: row.district.clone(),
                    name: row.name.clone(),
                    reason: e.to_string(),
                });
            }
        }

        progress.inc(1);
    }

    store.commit()?;

    report.table_rows = store.row_count()?;
    report.leaderboard = store.district_counts(leaderboard_size)?;
    store.create_district_index()?;

    progress.finish(format!(
        "{} inserted, {} already present, {} failed",
        report.inserted, report.already_present, report.skipped_failed
    ));

    log::info!(
        "Persisted neighborhoods: {} requested, {} inserted, {} already present, \
         {} skipped (unmatched district), {} skipped (row error), {} rows in table",
        report.requested,
        report.inserted,
        report.already_present,
        report.skipped_unmatched,
        report.skipped_failed,
        report.table_rows,
    );

    Ok(report)
}
