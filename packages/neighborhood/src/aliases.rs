//! Compile-time registry of district alias tables.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Supporting a new region requires creating a TOML file in `aliases/` and
//! adding a corresponding entry here.

use std::path::Path;

use district_seed_neighborhood_models::AliasTableDef;

use crate::NeighborhoodError;

/// Number of registered alias tables. Enforced by a test.
#[cfg(test)]
const EXPECTED_TABLE_COUNT: usize = 1;

/// Embedded TOML alias tables.
const ALIAS_TOMLS: &[(&str, &str)] = &[("istanbul", include_str!("../aliases/istanbul.toml"))];

/// Returns all embedded alias tables.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the registry tests.
#[must_use]
pub fn all_alias_tables() -> Vec<AliasTableDef> {
    ALIAS_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse alias table '{name}': {e}"))
        })
        .collect()
}

/// Parses an alias table from TOML text.
///
/// # Errors
///
/// Returns [`NeighborhoodError::Toml`] if the text is not a valid alias
/// table.
pub fn parse_alias_table(toml_str: &str) -> Result<AliasTableDef, NeighborhoodError> {
    Ok(toml::de::from_str(toml_str)?)
}

/// Resolves an alias table by embedded id, falling back to reading
/// `id_or_path` as a TOML file.
///
/// # Errors
///
/// Returns [`NeighborhoodError`] if no embedded table matches and the file
/// cannot be read or parsed.
pub fn resolve_alias_table(id_or_path: &str) -> Result<AliasTableDef, NeighborhoodError> {
    if let Some(table) = all_alias_tables()
        .into_iter()
        .find(|table| table.id == id_or_path)
    {
        return Ok(table);
    }

    let path = Path::new(id_or_path);
    if !path.is_file() {
        return Err(NeighborhoodError::UnknownAliasTable {
            id: id_or_path.to_string(),
        });
    }

    log::debug!("Loading alias table from {}", path.display());
    parse_alias_table(&std::fs::read_to_string(path)?)
}
