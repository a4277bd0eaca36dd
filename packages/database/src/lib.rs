#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for district boundaries and placed neighborhoods.
//!
//! A single `DuckDB` file (by default `data/shared/district_seed.duckdb`)
//! holds the `district_boundaries` lookup and the `neighborhoods` output
//! table. All access is synchronous through the `duckdb` crate.

pub mod boundaries_db;
pub mod db;
pub mod neighborhoods_db;
pub mod paths;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query or connection error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (creating the data directory, reading an import file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error during boundary import.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A failed statement aborted the open transaction and it could not be
    /// reopened, so nothing from the run can be committed.
    #[error("Transaction aborted: {message}")]
    TransactionAborted {
        /// Error raised while recovering the transaction.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
