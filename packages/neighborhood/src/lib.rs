#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood extraction, district normalization, and placement.
//!
//! Turns a flat text dump of neighborhood tuples into placed rows:
//! records are scanned out of the text ([`extract`]), their district
//! spellings reconciled against the boundary lookup ([`normalize`]),
//! grouped per district in first-seen order ([`group`]), given a
//! deterministic coordinate inside the district's bounding box
//! ([`placement`]), and finally upserted through a
//! [`persist::NeighborhoodStore`] ([`persist`]).
//!
//! Alias tables are TOML files embedded at compile time, following the
//! same registry pattern as other embedded definitions ([`aliases`]).

pub mod aliases;
pub mod extract;
pub mod group;
pub mod normalize;
pub mod persist;
pub mod placement;
pub mod progress;

use thiserror::Error;

/// Errors that can occur while preparing neighborhoods for placement.
#[derive(Debug, Error)]
pub enum NeighborhoodError {
    /// Reading an alias file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An alias file is not valid TOML for an alias table.
    #[error("Alias table parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The same alias maps to two different canonical districts.
    #[error("Alias '{alias}' maps to both '{first}' and '{second}'")]
    AliasConflict {
        /// The duplicated alias (upper-cased).
        alias: String,
        /// Canonical district from the earlier entry.
        first: String,
        /// Canonical district from the later entry.
        second: String,
    },

    /// No embedded alias table has the requested id and no file exists at
    /// that path.
    #[error("Unknown alias table: {id}")]
    UnknownAliasTable {
        /// Requested table id or path.
        id: String,
    },
}
