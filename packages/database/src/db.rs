//! Database connection utilities.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the database at `path` and ensures both the boundary
/// and neighborhood schemas exist.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    log::debug!("Opening {}", path.display());
    let conn = Connection::open(path)?;
    create_schema(&conn)?;

    Ok(conn)
}

/// Opens the database at [`crate::paths::db_path`].
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::db_path())
}

/// Opens a throwaway in-memory database with the full schema.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    crate::boundaries_db::create_schema(conn)?;
    crate::neighborhoods_db::create_schema(conn)?;
    Ok(())
}
