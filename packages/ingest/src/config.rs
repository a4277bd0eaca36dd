//! Run configuration loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) seeds
//! the İstanbul dump with the embedded alias table.

use std::path::Path;

use district_seed_neighborhood::placement::{DEFAULT_MARGIN, MIN_POSITIVE_MARGIN};
use district_seed_neighborhood_models::DistrictField;
use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Settings for one seeding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    /// Region literal a tuple must carry to be extracted.
    pub region: String,
    /// Which raw field names the parent district.
    pub district_field: DistrictField,
    /// Fraction of each side of the bounding box kept clear.
    pub margin: f64,
    /// Number of districts in the final leaderboard.
    pub leaderboard_size: usize,
    /// Embedded alias table id, or a path to a TOML alias file.
    pub aliases: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            region: "İstanbul".to_string(),
            district_field: DistrictField::default(),
            margin: DEFAULT_MARGIN,
            leaderboard_size: 10,
            aliases: "istanbul".to_string(),
        }
    }
}

impl SeedConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Toml`] for malformed TOML or
    /// [`IngestError::InvalidConfig`] if a value is out of range.
    pub fn from_toml(text: &str) -> Result<Self, IngestError> {
        let config: Self = toml::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, or the defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, IngestError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        log::debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidConfig`] if the region is blank or the
    /// margin is neither `0.0` nor in `[MIN_POSITIVE_MARGIN, 0.5)`.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.region.trim().is_empty() {
            return Err(IngestError::InvalidConfig {
                message: "region must not be empty".to_string(),
            });
        }

        if !(0.0..0.5).contains(&self.margin) {
            return Err(IngestError::InvalidConfig {
                message: format!("margin must be in [0.0, 0.5), got {}", self.margin),
            });
        }

        if self.margin > 0.0 && self.margin < MIN_POSITIVE_MARGIN {
            return Err(IngestError::InvalidConfig {
                message: format!(
                    "margin {} is below {MIN_POSITIVE_MARGIN} and would round onto the box edge; \
                     use 0.0 or a larger margin",
                    self.margin
                ),
            });
        }

        Ok(())
    }
}
