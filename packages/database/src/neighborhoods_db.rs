//! The `neighborhoods` output table.
//!
//! Each placed neighborhood is one row, unique on `(district, name)`.
//! [`DuckDbStore`] implements [`NeighborhoodStore`] with
//! `ON CONFLICT ... DO NOTHING` so re-running the pipeline never moves a
//! stored point.

use district_seed_neighborhood::persist::{NeighborhoodStore, UpsertOutcome};
use district_seed_neighborhood_models::{DistrictCount, Neighborhood};
use duckdb::Connection;

use crate::DbError;

/// Name of the district lookup index.
pub const DISTRICT_INDEX: &str = "idx_neighborhoods_district";

pub(crate) fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE SEQUENCE IF NOT EXISTS neighborhoods_id_seq START 1;

        CREATE TABLE IF NOT EXISTS neighborhoods (
            id INTEGER PRIMARY KEY DEFAULT nextval('neighborhoods_id_seq'),
            district TEXT NOT NULL,
            name TEXT NOT NULL,
            zipcode INTEGER,
            lat DOUBLE NOT NULL,
            lng DOUBLE NOT NULL,
            UNIQUE (district, name)
        );",
    )?;
    Ok(())
}

/// [`NeighborhoodStore`] over a `DuckDB` connection.
///
/// The whole run shares one explicit transaction. `DuckDB` aborts a
/// transaction on any failed statement, so a failed upsert rolls back,
/// reopens the transaction, and replays the rows inserted so far. If that
/// recovery fails the store is poisoned and [`NeighborhoodStore::commit`]
/// returns an error instead of silently committing nothing.
pub struct DuckDbStore<'a> {
    conn: &'a Connection,
    /// Rows inserted in the open transaction, replayed after a rollback.
    inserted: Vec<Neighborhood>,
    poisoned: Option<String>,
}

impl<'a> DuckDbStore<'a> {
    /// Wraps an open connection whose schema already exists.
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            inserted: Vec::new(),
            poisoned: None,
        }
    }

    fn insert(&self, row: &Neighborhood, zipcode: Option<i32>) -> Result<usize, DbError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO neighborhoods (district, name, zipcode, lat, lng)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (district, name) DO NOTHING",
        )?;
        Ok(stmt.execute(duckdb::params![
            row.district,
            row.name,
            zipcode,
            row.lat,
            row.lng,
        ])?)
    }

    /// Rolls back the aborted transaction, opens a fresh one, and re-inserts
    /// every row this run had already inserted.
    fn recover(&self) -> Result<(), DbError> {
        self.conn.execute_batch("ROLLBACK")?;
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        log::debug!(
            "Replaying {} neighborhoods after a failed upsert",
            self.inserted.len()
        );
        for row in &self.inserted {
            self.insert(row, zipcode_column(row)?)?;
        }

        Ok(())
    }
}

fn zipcode_column(row: &Neighborhood) -> Result<Option<i32>, DbError> {
    row.zipcode
        .map(i32::try_from)
        .transpose()
        .map_err(|e| DbError::Conversion {
            message: format!("zip code out of range: {e}"),
        })
}

impl NeighborhoodStore for DuckDbStore<'_> {
    type Error = DbError;

    fn begin(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.inserted.clear();
        self.poisoned = None;
        Ok(())
    }

    fn upsert(&mut self, row: &Neighborhood) -> Result<UpsertOutcome, DbError> {
        if let Some(reason) = &self.poisoned {
            return Err(DbError::TransactionAborted {
                message: reason.clone(),
            });
        }

        let zipcode = zipcode_column(row)?;

        match self.insert(row, zipcode) {
            Ok(0) => Ok(UpsertOutcome::AlreadyPresent),
            Ok(_) => {
                self.inserted.push(row.clone());
                Ok(UpsertOutcome::Inserted)
            }
            Err(e) => {
                if let Err(recovery) = self.recover() {
                    log::error!("Could not recover transaction after failed upsert: {recovery}");
                    self.poisoned = Some(recovery.to_string());
                }
                Err(e)
            }
        }
    }

    fn commit(&mut self) -> Result<(), DbError> {
        if let Some(reason) = self.poisoned.take() {
            self.conn.execute_batch("ROLLBACK").ok();
            self.inserted.clear();
            return Err(DbError::TransactionAborted { message: reason });
        }

        self.conn.execute_batch("COMMIT")?;
        self.inserted.clear();
        Ok(())
    }

    fn create_district_index(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {DISTRICT_INDEX} ON neighborhoods (district);"
        ))?;
        Ok(())
    }

    fn row_count(&self) -> Result<u64, DbError> {
        let count: i64 = self
            .conn
            .prepare("SELECT COUNT(*) FROM neighborhoods")?
            .query_row([], |row| row.get(0))?;
        to_count(count)
    }

    fn district_counts(&self, limit: usize) -> Result<Vec<DistrictCount>, DbError> {
        district_counts(self.conn, limit)
    }
}

/// Districts with the most rows, largest first, ties by name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn district_counts(conn: &Connection, limit: usize) -> Result<Vec<DistrictCount>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT district, COUNT(*) AS n
         FROM neighborhoods
         GROUP BY district
         ORDER BY n DESC, district ASC
         LIMIT {limit}"
    ))?;
    let mut rows = stmt.query([])?;

    let mut counts = Vec::new();
    while let Some(row) = rows.next()? {
        let district: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        counts.push(DistrictCount {
            district,
            count: to_count(count)?,
        });
    }

    Ok(counts)
}

/// Fetches a stored neighborhood by its unique key.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get(conn: &Connection, district: &str, name: &str) -> Result<Option<Neighborhood>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT district, name, zipcode, lat, lng
         FROM neighborhoods
         WHERE district = ? AND name = ?",
    )?;
    let mut rows = stmt.query(duckdb::params![district, name])?;

    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let zipcode: Option<i32> = row.get(2)?;
    Ok(Some(Neighborhood {
        district: row.get(0)?,
        name: row.get(1)?,
        zipcode: zipcode.map(i64::from),
        lat: row.get(3)?,
        lng: row.get(4)?,
    }))
}

fn to_count(value: i64) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|e| DbError::Conversion {
        message: format!("negative row count: {e}"),
    })
}
