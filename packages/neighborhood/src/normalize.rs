//! Reconciles raw district spellings with the boundary lookup.
//!
//! Dumps and boundary tables disagree on Turkish dotted/dotless capitals
//! and on renamed districts. Raw spellings are upper-cased with the
//! locale-independent Unicode mapping, then passed through an alias table;
//! unknown spellings fall through unchanged.

use std::collections::BTreeMap;

use district_seed_neighborhood_models::{AliasEntry, AliasTableDef};

use crate::NeighborhoodError;

/// Upper-cases a district spelling for comparison.
///
/// Surrounding whitespace is dropped first, so padded spellings in the
/// dump and in boundary exports resolve to the same key.
#[must_use]
pub fn fold_district(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// An ordered alias table resolved last-entry-wins.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    resolved: BTreeMap<String, String>,
}

impl AliasTable {
    /// Builds a table from ordered `alias -> canonical` pairs.
    ///
    /// Both sides are folded with [`fold_district`]. A repeated alias that
    /// maps to the same canonical district is logged and collapsed. A
    /// repeated alias that maps somewhere else is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`NeighborhoodError::AliasConflict`] on contradictory
    /// duplicates.
    pub fn from_entries(
        entries: impl IntoIterator<Item = AliasEntry>,
    ) -> Result<Self, NeighborhoodError> {
        let mut table = Self::default();

        for entry in entries {
            let alias = fold_district(&entry.alias);
            let canonical = fold_district(&entry.canonical);

            if let Some(previous) = table.resolved.get(&alias) {
                if *previous != canonical {
                    return Err(NeighborhoodError::AliasConflict {
                        alias,
                        first: previous.clone(),
                        second: canonical,
                    });
                }
                log::warn!("Alias '{alias}' is listed more than once (-> '{canonical}')");
            }

            table.resolved.insert(alias.clone(), canonical.clone());
            table.entries.push(AliasEntry { alias, canonical });
        }

        Ok(table)
    }

    /// Builds a table from a deserialized alias definition.
    ///
    /// # Errors
    ///
    /// See [`AliasTable::from_entries`].
    pub fn from_def(def: &AliasTableDef) -> Result<Self, NeighborhoodError> {
        let table = Self::from_entries(def.aliases.iter().cloned())?;
        log::debug!(
            "Loaded alias table {} ({} aliases, region {})",
            def.id,
            table.len(),
            def.region
        );
        Ok(table)
    }

    /// Looks up a folded alias.
    #[must_use]
    pub fn get(&self, folded: &str) -> Option<&str> {
        self.resolved.get(folded).map(String::as_str)
    }

    /// Number of distinct aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Whether the table has no aliases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Entries in definition order, including collapsed duplicates.
    #[must_use]
    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }
}

/// Maps raw district spellings to canonical district identifiers.
#[derive(Debug, Clone, Default)]
pub struct DistrictNormalizer {
    aliases: AliasTable,
}

impl DistrictNormalizer {
    /// Creates a normalizer over the given alias table.
    #[must_use]
    pub const fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// Returns the canonical district for a raw spelling.
    ///
    /// Falls back to the upper-cased spelling when no alias matches.
    #[must_use]
    pub fn canonicalize(&self, raw: &str) -> String {
        let folded = fold_district(raw);
        match self.aliases.get(&folded) {
            Some(canonical) => canonical.to_string(),
            None => folded,
        }
    }

    /// The underlying alias table.
    #[must_use]
    pub const fn aliases(&self) -> &AliasTable {
        &self.aliases
    }
}
