//! District boundary lookup stored in `DuckDB`.
//!
//! One row per `(region, district)` with a center point and optional
//! northeast/southwest corners. Rows are loaded from CSV exports and read
//! back as a [`BoundaryLookup`] keyed by upper-cased district name.

use std::io::Read;
use std::path::Path;

use district_seed_neighborhood::normalize::fold_district;
use district_seed_neighborhood_models::{BoundaryLookup, DistrictBoundary};
use duckdb::Connection;
use serde::Deserialize;

use crate::DbError;

pub(crate) fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS district_boundaries (
            region TEXT NOT NULL,
            district TEXT NOT NULL,
            center_lat DOUBLE NOT NULL,
            center_lng DOUBLE NOT NULL,
            northeast_lat DOUBLE,
            northeast_lng DOUBLE,
            southwest_lat DOUBLE,
            southwest_lng DOUBLE,
            PRIMARY KEY (region, district)
        );",
    )?;
    Ok(())
}

/// One boundary row as it appears in an import CSV.
///
/// Empty corner cells deserialize as `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundaryRow {
    /// Region the district belongs to (e.g. `"İstanbul"`).
    pub region: String,
    /// District name in any casing.
    pub district: String,
    /// Center latitude.
    pub center_lat: f64,
    /// Center longitude.
    pub center_lng: f64,
    /// Northeast corner latitude.
    pub northeast_lat: Option<f64>,
    /// Northeast corner longitude.
    pub northeast_lng: Option<f64>,
    /// Southwest corner latitude.
    pub southwest_lat: Option<f64>,
    /// Southwest corner longitude.
    pub southwest_lng: Option<f64>,
}

/// Upserts boundary rows, replacing any existing row for the same
/// `(region, district)`.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub fn upsert_boundaries(conn: &Connection, rows: &[BoundaryRow]) -> Result<u64, DbError> {
    if rows.is_empty() {
        return Ok(0);
    }

    conn.execute_batch("BEGIN TRANSACTION")?;

    let mut stmt = conn.prepare(
        "INSERT INTO district_boundaries (
            region, district, center_lat, center_lng,
            northeast_lat, northeast_lng, southwest_lat, southwest_lng
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (region, district) DO UPDATE SET
            center_lat = EXCLUDED.center_lat,
            center_lng = EXCLUDED.center_lng,
            northeast_lat = EXCLUDED.northeast_lat,
            northeast_lng = EXCLUDED.northeast_lng,
            southwest_lat = EXCLUDED.southwest_lat,
            southwest_lng = EXCLUDED.southwest_lng",
    )?;

    let mut written = 0u64;
    for row in rows {
        written += stmt.execute(duckdb::params![
            row.region,
            row.district,
            row.center_lat,
            row.center_lng,
            row.northeast_lat,
            row.northeast_lng,
            row.southwest_lat,
            row.southwest_lng,
        ])? as u64;
    }

    conn.execute_batch("COMMIT")?;

    Ok(written)
}

/// Reads boundary rows from CSV with a header line.
///
/// Rows that fail to deserialize are logged and skipped.
///
/// # Errors
///
/// Returns [`DbError::Csv`] if the header cannot be read.
pub fn read_boundary_csv(reader: impl Read) -> Result<Vec<BoundaryRow>, DbError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.headers()?;

    let mut rows = Vec::new();
    for (line, result) in csv_reader.deserialize::<BoundaryRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!("  skipping malformed boundary row {}: {e}", line + 2),
        }
    }

    Ok(rows)
}

/// Imports a boundary CSV file into the lookup table.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be opened or an insert fails.
pub fn import_csv(conn: &Connection, path: &Path) -> Result<u64, DbError> {
    let file = std::fs::File::open(path)?;
    let rows = read_boundary_csv(file)?;
    log::info!("Read {} boundary rows from {}", rows.len(), path.display());
    upsert_boundaries(conn, &rows)
}

/// Loads every boundary for `region`, keyed by upper-cased district name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn load_lookup(conn: &Connection, region: &str) -> Result<BoundaryLookup, DbError> {
    let mut stmt = conn.prepare(
        "SELECT district, center_lat, center_lng,
                northeast_lat, northeast_lng, southwest_lat, southwest_lng
         FROM district_boundaries
         WHERE region = ?
         ORDER BY district",
    )?;
    let mut rows = stmt.query(duckdb::params![region])?;

    let mut lookup = BoundaryLookup::new();
    while let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        let district = fold_district(&raw);

        let boundary = DistrictBoundary {
            district: district.clone(),
            center_lat: row.get(1)?,
            center_lng: row.get(2)?,
            northeast_lat: row.get(3)?,
            northeast_lng: row.get(4)?,
            southwest_lat: row.get(5)?,
            southwest_lng: row.get(6)?,
        };

        if lookup.insert(district, boundary).is_some() {
            log::debug!("Boundary '{raw}' collides with another district after upper-casing");
        }
    }

    log::info!("Loaded {} districts with boundaries for {region}", lookup.len());

    Ok(lookup)
}

/// Lists the regions that have at least one boundary.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list_regions(conn: &Connection) -> Result<Vec<(String, u64)>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT region, COUNT(*) FROM district_boundaries GROUP BY region ORDER BY region",
    )?;
    let mut rows = stmt.query([])?;

    let mut regions = Vec::new();
    while let Some(row) = rows.next()? {
        let region: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        regions.push((
            region,
            u64::try_from(count).map_err(|e| DbError::Conversion {
                message: format!("negative district count: {e}"),
            })?,
        ));
    }

    Ok(regions)
}
