#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood, district boundary, and alias table types.
//!
//! Defines the raw tuple shape scanned out of neighborhood dumps, the
//! district boundary lookup consumed during placement, the TOML schema for
//! district alias tables, and the output row persisted per neighborhood.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// A neighborhood tuple as scanned out of the raw text dump.
///
/// Shape: `('<id>','<region>','<district>','<neighborhood>','<town>',<zip>)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record identifier from the dump.
    pub record_id: String,
    /// Region literal (e.g. `"İstanbul"`).
    pub region: String,
    /// Third tuple field. Named "district" in the dump, but usually an area
    /// label rather than the administrative district.
    pub district: String,
    /// Neighborhood name.
    pub neighborhood: String,
    /// Fifth tuple field, which carries the administrative district in
    /// the dumps seen so far.
    pub town: String,
    /// Postal code, `None` when the dump has `NULL` or a non-numeric value.
    pub zipcode: Option<i64>,
}

impl RawRecord {
    /// Returns the raw district spelling according to `field`.
    #[must_use]
    pub fn district_source(&self, field: DistrictField) -> &str {
        match field {
            DistrictField::District => &self.district,
            DistrictField::Town => &self.town,
        }
    }
}

/// Which [`RawRecord`] field names the parent district.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistrictField {
    /// The third tuple field.
    District,
    /// The fifth tuple field.
    #[default]
    Town,
}

/// A neighborhood awaiting placement, in first-seen order within its
/// district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodEntry {
    /// Neighborhood name as it appeared in the dump.
    pub name: String,
    /// Postal code, if present and numeric.
    pub zipcode: Option<i64>,
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Latitude extent (`north - south`).
    #[must_use]
    pub fn lat_range(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude extent (`east - west`).
    #[must_use]
    pub fn lng_range(&self) -> f64 {
        self.east - self.west
    }

    /// Returns the box shrunk by `margin` (a fraction of each extent) on
    /// every side.
    #[must_use]
    pub fn inset(&self, margin: f64) -> Self {
        let lat_pad = self.lat_range() * margin;
        let lng_pad = self.lng_range() * margin;
        Self {
            west: self.west + lng_pad,
            south: self.south + lat_pad,
            east: self.east - lng_pad,
            north: self.north - lat_pad,
        }
    }

    /// Whether the point lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lng)
    }
}

/// District boundary row from the boundary lookup.
///
/// Corner fields are optional. A boundary with any corner missing, or
/// with corners that are inverted or non-finite, has no usable
/// [`BoundingBox`] and its neighborhoods all land on the center point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictBoundary {
    /// Canonical (upper-cased) district name.
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

impl DistrictBoundary {
    /// Returns the bounding box when both corners are present and valid.
    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        let north = self.northeast_lat?;
        let east = self.northeast_lng?;
        let south = self.southwest_lat?;
        let west = self.southwest_lng?;

        if ![north, east, south, west].iter().all(|v| v.is_finite()) {
            return None;
        }
        if north < south || east < west {
            return None;
        }

        Some(BoundingBox::new(west, south, east, north))
    }
}

/// Boundary lookup keyed by upper-cased district name.
pub type BoundaryLookup = BTreeMap<String, DistrictBoundary>;

/// A placed neighborhood, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    /// Canonical district name.
    pub district: String,
    /// Neighborhood name.
    pub name: String,
    /// Postal code.
    pub zipcode: Option<i64>,
    /// Synthesized latitude.
    pub lat: f64,
    /// Synthesized longitude.
    pub lng: f64,
}

/// A district paired with a row count, used for leaderboards and for
/// reporting unmatched districts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictCount {
    /// Canonical district name.
    pub district: String,
    /// Number of neighborhoods.
    pub count: u64,
}

/// A district alias table, deserialized from TOML.
///
/// Resolves spelling and diacritic differences between a neighborhood
/// dump and the boundary lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasTableDef {
    /// Unique table identifier (e.g. `"istanbul"`).
    pub id: String,
    /// Region literal the table applies to.
    pub region: String,
    /// Ordered alias pairs. Later entries win on duplicate aliases.
    #[serde(default)]
    pub aliases: Vec<AliasEntry>,
}

/// A single `alias -> canonical` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Spelling found in the dump.
    pub alias: String,
    /// Spelling used by the boundary lookup.
    pub canonical: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary(corners: Option<(f64, f64, f64, f64)>) -> DistrictBoundary {
        DistrictBoundary {
            district: "X".to_string(),
            center_lat: 40.05,
            center_lng: 28.1,
            northeast_lat: corners.map(|c| c.0),
            northeast_lng: corners.map(|c| c.1),
            southwest_lat: corners.map(|c| c.2),
            southwest_lng: corners.map(|c| c.3),
        }
    }

    #[test]
    fn bbox_requires_all_corners() {
        let mut b = boundary(Some((40.1, 28.2, 40.0, 28.0)));
        assert!(b.bbox().is_some());

        b.southwest_lng = None;
        assert!(b.bbox().is_none());
    }

    #[test]
    fn inverted_corners_have_no_bbox() {
        assert!(boundary(Some((40.0, 28.2, 40.1, 28.0))).bbox().is_none());
        assert!(boundary(Some((40.1, 28.0, 40.0, 28.2))).bbox().is_none());
    }

    #[test]
    fn degenerate_box_is_still_valid() {
        let bbox = boundary(Some((40.0, 28.0, 40.0, 28.0))).bbox().unwrap();
        assert!(bbox.lat_range().abs() < f64::EPSILON);
        assert!(bbox.contains(40.0, 28.0));
    }

    #[test]
    fn inset_shrinks_each_side() {
        let inset = BoundingBox::new(28.0, 40.0, 28.2, 40.1).inset(0.1);
        assert!((inset.south - 40.01).abs() < 1e-9);
        assert!((inset.north - 40.09).abs() < 1e-9);
        assert!((inset.west - 28.02).abs() < 1e-9);
        assert!((inset.east - 28.18).abs() < 1e-9);
    }

    #[test]
    fn district_source_follows_field() {
        let record = RawRecord {
            record_id: "1".to_string(),
            region: "İstanbul".to_string(),
            district: "AREA".to_string(),
            neighborhood: "Moda".to_string(),
            town: "Kadıköy".to_string(),
            zipcode: None,
        };
        assert_eq!(record.district_source(DistrictField::Town), "Kadıköy");
        assert_eq!(record.district_source(DistrictField::District), "AREA");
    }

    #[test]
    fn district_field_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            field: DistrictField,
        }
        let w: Wrapper = toml::from_str("field = \"district\"").unwrap();
        assert_eq!(w.field, DistrictField::District);
        assert_eq!(DistrictField::Town.as_ref(), "town");
    }
}
