//! Deterministic placement of neighborhoods inside a district's bounding
//! box.
//!
//! Source dumps carry no coordinates, so each neighborhood gets a stand-in
//! point for map display. The district box is divided into a `g x g` grid;
//! the neighborhood's first-seen index picks the cell and an MD5 hash of
//! its name picks a stable offset inside that cell. Points are kept a
//! fixed margin away from the box edges.
//!
//! This is not geocoding. The only guarantees are that output is a pure
//! function of `(boundary, name, index, total, margin)`, that it lands
//! inside the box, and that neighbors in the grid do not collapse onto one
//! point.

use district_seed_neighborhood_models::{
    BoundaryLookup, DistrictBoundary, DistrictCount, Neighborhood, NeighborhoodEntry,
};

use crate::group::DistrictGroups;

/// Default inset from each box edge, as a fraction of the box extent.
pub const DEFAULT_MARGIN: f64 = 0.1;

/// Smallest non-zero margin that survives coordinate rounding.
///
/// Points in the first grid row or column sit exactly `margin * extent`
/// inside the box. Below this margin that offset can round away to the
/// box edge for boxes smaller than about 0.0005 degrees on a side.
pub const MIN_POSITIVE_MARGIN: f64 = 1e-4;

/// Smallest grid edge, so tiny districts still spread over a 3x3 grid.
pub const MIN_GRID_SIZE: usize = 3;

/// Total in-cell jitter span, as a fraction of one cell.
const JITTER_SPAN: f64 = 0.6;

/// Modulus for each jitter slice taken from the name hash.
const JITTER_BUCKETS: u128 = 1000;

/// Decimal places kept in stored coordinates.
const COORDINATE_DECIMALS: i32 = 7;

/// Grid edge length for a district with `total` neighborhoods.
///
/// `max(3, ceil(sqrt(total)) + 1)`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn grid_size(total: usize) -> usize {
    let root = (total as f64).sqrt().ceil() as usize;
    MIN_GRID_SIZE.max(root + 1)
}

/// MD5 digest of the name, read as a big-endian 128-bit integer.
#[must_use]
pub fn name_hash(name: &str) -> u128 {
    u128::from_be_bytes(md5::compute(name.as_bytes()).0)
}

/// Jitter in `[-0.5, 0.5) * JITTER_SPAN / grid` from one hash slice.
#[allow(clippy::cast_precision_loss)]
fn jitter(slice: u128, grid: usize) -> f64 {
    let unit = (slice % JITTER_BUCKETS) as f64 / JITTER_BUCKETS as f64;
    (unit - 0.5) * JITTER_SPAN / grid as f64
}

/// Rounds to [`COORDINATE_DECIMALS`] places.
fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}

/// Computes the `(lat, lng)` for the neighborhood at `index` (0-based,
/// first-seen order) among `total` neighborhoods of one district.
///
/// Without a usable bounding box the district center is returned as-is.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn place(
    boundary: &DistrictBoundary,
    name: &str,
    index: usize,
    total: usize,
    margin: f64,
) -> (f64, f64) {
    let Some(bbox) = boundary.bbox() else {
        return (boundary.center_lat, boundary.center_lng);
    };

    let grid = grid_size(total);
    let cell_x = (index % grid) as f64 / grid as f64;
    let cell_y = (index / grid % grid) as f64 / grid as f64;

    let hash = name_hash(name);
    let jitter_x = jitter(hash, grid);
    let jitter_y = jitter(hash / JITTER_BUCKETS, grid);

    // Negative jitter in the first row/column would otherwise dip into the
    // margin.
    let unit_x = (cell_x + jitter_x).clamp(0.0, 1.0);
    let unit_y = (cell_y + jitter_y).clamp(0.0, 1.0);

    let inner = 2.0f64.mul_add(-margin, 1.0);
    let lat = inner
        .mul_add(unit_y, margin)
        .mul_add(bbox.lat_range(), bbox.south);
    let lng = inner
        .mul_add(unit_x, margin)
        .mul_add(bbox.lng_range(), bbox.west);

    (round_coordinate(lat), round_coordinate(lng))
}

/// Places every neighborhood of one district.
#[must_use]
pub fn place_district(
    district: &str,
    boundary: &DistrictBoundary,
    entries: &[NeighborhoodEntry],
    margin: f64,
) -> Vec<Neighborhood> {
    let total = entries.len();

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let (lat, lng) = place(boundary, &entry.name, index, total, margin);
            Neighborhood {
                district: district.to_string(),
                name: entry.name.clone(),
                zipcode: entry.zipcode,
                lat,
                lng,
            }
        })
        .collect()
}

/// Placed rows for every matched district, plus the districts that had no
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// Rows in district order, then first-seen order.
    pub rows: Vec<Neighborhood>,
    /// Districts missing from the boundary lookup, with their skipped
    /// neighborhood counts.
    pub unmatched: Vec<DistrictCount>,
}

impl Placement {
    /// Total neighborhoods skipped because their district was unmatched.
    #[must_use]
    pub fn skipped_unmatched(&self) -> u64 {
        self.unmatched.iter().map(|d| d.count).sum()
    }
}

/// Places all grouped neighborhoods against the boundary lookup.
///
/// Districts absent from `lookup` are reported in
/// [`Placement::unmatched`] and contribute no rows.
#[must_use]
pub fn place_all(groups: &DistrictGroups, lookup: &BoundaryLookup, margin: f64) -> Placement {
    let mut placement = Placement::default();

    for group in groups {
        let count = group.neighborhoods.len() as u64;

        let Some(boundary) = lookup.get(&group.district) else {
            log::warn!(
                "District '{}' not found in boundary lookup, skipping {count} neighborhoods",
                group.district
            );
            placement.unmatched.push(DistrictCount {
                district: group.district.clone(),
                count,
            });
            continue;
        };

        if boundary.bbox().is_none() {
            log::debug!(
                "{}: no usable bounding box, using center point",
                group.district
            );
        }

        placement.rows.extend(place_district(
            &group.district,
            boundary,
            &group.neighborhoods,
            margin,
        ));

        log::info!(
            "  {}: {count} neighborhoods distributed within boundaries",
            group.district
        );
    }

    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::DistrictNormalizer;
    use district_seed_neighborhood_models::{DistrictField, RawRecord};
    use std::sync::{Mutex, Once, PoisonError};

    const EPS: f64 = 1e-9;

    static CAPTURED: Mutex<Vec<(log::Level, String)>> = Mutex::new(Vec::new());

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            CAPTURED
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    /// Routes this test binary's log records into [`CAPTURED`].
    fn capture_logs() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
    }

    fn warnings_mentioning(needle: &str) -> Vec<String> {
        CAPTURED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(level, msg)| *level == log::Level::Warn && msg.contains(needle))
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    fn boundary_x() -> DistrictBoundary {
        DistrictBoundary {
            district: "X".to_string(),
            center_lat: 40.05,
            center_lng: 28.1,
            northeast_lat: Some(40.1),
            northeast_lng: Some(28.2),
            southwest_lat: Some(40.0),
            southwest_lng: Some(28.0),
        }
    }

    fn entries(names: &[&str]) -> Vec<NeighborhoodEntry> {
        names
            .iter()
            .map(|name| NeighborhoodEntry {
                name: (*name).to_string(),
                zipcode: None,
            })
            .collect()
    }

    #[test]
    fn grid_size_has_floor_of_three() {
        assert_eq!(grid_size(0), 3);
        assert_eq!(grid_size(1), 3);
        assert_eq!(grid_size(2), 3);
        assert_eq!(grid_size(4), 3);
        assert_eq!(grid_size(5), 4);
        assert_eq!(grid_size(10), 5);
        assert_eq!(grid_size(16), 5);
        assert_eq!(grid_size(17), 6);
    }

    #[test]
    fn name_hash_matches_md5_digest() {
        assert_eq!(name_hash("A"), 0x7fc5_6270_e7a7_0fa8_1a59_35b7_2eac_be29);
        assert_eq!(name_hash("A") % 1000, 345);
        assert_eq!(name_hash("A") / 1000 % 1000, 554);
    }

    #[test]
    fn small_district_scenario() {
        let boundary = boundary_x();
        let rows = place_district("X", &boundary, &entries(&["A", "B"]), DEFAULT_MARGIN);
        let inset = boundary.bbox().unwrap().inset(DEFAULT_MARGIN);

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(
                row.lat >= inset.south - EPS && row.lat <= inset.north + EPS,
                "{} lat {} outside inset box",
                row.name,
                row.lat
            );
            assert!(
                row.lng >= inset.west - EPS && row.lng <= inset.east + EPS,
                "{} lng {} outside inset box",
                row.name,
                row.lng
            );
        }
        assert_ne!((rows[0].lat, rows[0].lng), (rows[1].lat, rows[1].lng));

        // "A" sits in cell (0, 0); its negative x jitter is clamped to the
        // inset edge.
        assert!((rows[0].lat - 40.010_864).abs() < EPS);
        assert!((rows[0].lng - 28.02).abs() < EPS);
        assert!((rows[1].lat - 40.013_808).abs() < EPS);
        assert!((rows[1].lng - 28.058_389_3).abs() < EPS);
    }

    #[test]
    fn placement_is_deterministic() {
        let boundary = boundary_x();
        for index in 0..40 {
            let first = place(&boundary, "Caferağa Mah.", index, 40, DEFAULT_MARGIN);
            let second = place(&boundary, "Caferağa Mah.", index, 40, DEFAULT_MARGIN);
            assert_eq!(first.0.to_bits(), second.0.to_bits());
            assert_eq!(first.1.to_bits(), second.1.to_bits());
        }
    }

    #[test]
    fn every_point_stays_strictly_inside_box() {
        let boundary = boundary_x();
        let bbox = boundary.bbox().unwrap();
        let names: Vec<String> = (0..200).map(|i| format!("Mahalle {i}")).collect();

        for (index, name) in names.iter().enumerate() {
            let (lat, lng) = place(&boundary, name, index, names.len(), DEFAULT_MARGIN);
            assert!(lat > bbox.south && lat < bbox.north, "{name}: lat {lat}");
            assert!(lng > bbox.west && lng < bbox.east, "{name}: lng {lng}");
        }
    }

    #[test]
    fn missing_corners_fall_back_to_center() {
        let mut boundary = boundary_x();
        boundary.northeast_lat = None;

        let rows = place_district("X", &boundary, &entries(&["A", "B", "C"]), DEFAULT_MARGIN);

        for row in rows {
            assert_eq!((row.lat, row.lng), (40.05, 28.1));
        }
    }

    #[test]
    fn inverted_corners_fall_back_to_center() {
        let mut boundary = boundary_x();
        boundary.southwest_lat = Some(40.2);

        assert_eq!(place(&boundary, "A", 0, 1, DEFAULT_MARGIN), (40.05, 28.1));
    }

    #[test]
    fn coordinates_are_rounded_to_seven_decimals() {
        let boundary = boundary_x();
        for index in 0..10 {
            let (lat, lng) = place(&boundary, &format!("N{index}"), index, 10, DEFAULT_MARGIN);
            assert!((lat * 1e7 - (lat * 1e7).round()).abs() < 1e-4, "lat {lat}");
            assert!((lng * 1e7 - (lng * 1e7).round()).abs() < 1e-4, "lng {lng}");
        }
    }

    #[test]
    fn zero_margin_still_inside_box() {
        let boundary = boundary_x();
        let bbox = boundary.bbox().unwrap();
        for index in 0..30 {
            let (lat, lng) = place(&boundary, &format!("Z{index}"), index, 30, 0.0);
            assert!(bbox.contains(lat, lng), "({lat}, {lng})");
        }
    }

    #[test]
    fn smallest_positive_margin_stays_off_the_edges() {
        let boundary = boundary_x();
        let bbox = boundary.bbox().unwrap();
        for index in 0..30 {
            let (lat, lng) = place(
                &boundary,
                &format!("M{index}"),
                index,
                30,
                MIN_POSITIVE_MARGIN,
            );
            assert!(lat > bbox.south && lat < bbox.north, "lat {lat} touches the box");
            assert!(lng > bbox.west && lng < bbox.east, "lng {lng} touches the box");
        }

        // "A" has negative x jitter in cell (0, 0), so it sits on the inset edge.
        let (_, lng) = place(&boundary, "A", 0, 2, MIN_POSITIVE_MARGIN);
        assert!(lng > bbox.west, "lng {lng}");
    }

    #[test]
    fn place_all_reports_unmatched_districts() {
        let records = vec![
            RawRecord {
                record_id: "1".to_string(),
                region: "R".to_string(),
                district: String::new(),
                neighborhood: "A".to_string(),
                town: "X".to_string(),
                zipcode: Some(34000),
            },
            RawRecord {
                record_id: "2".to_string(),
                region: "R".to_string(),
                district: String::new(),
                neighborhood: "P".to_string(),
                town: "Y".to_string(),
                zipcode: None,
            },
            RawRecord {
                record_id: "3".to_string(),
                region: "R".to_string(),
                district: String::new(),
                neighborhood: "Q".to_string(),
                town: "Y".to_string(),
                zipcode: None,
            },
        ];
        let groups = crate::group::group_by_district(
            records,
            &DistrictNormalizer::default(),
            DistrictField::Town,
        );
        let lookup = BoundaryLookup::from([("X".to_string(), boundary_x())]);

        let placement = place_all(&groups, &lookup, DEFAULT_MARGIN);

        assert_eq!(placement.rows.len(), 1);
        assert_eq!(placement.rows[0].district, "X");
        assert_eq!(placement.rows[0].zipcode, Some(34000));
        assert_eq!(
            placement.unmatched,
            vec![DistrictCount {
                district: "Y".to_string(),
                count: 2,
            }]
        );
        assert_eq!(placement.skipped_unmatched(), 2);
    }

    #[test]
    fn unmatched_district_logs_warning_with_name_and_count() {
        capture_logs();

        let mut groups = DistrictGroups::default();
        for name in ["P", "Q", "R"] {
            groups.push(
                "KAYIP İLÇE".to_string(),
                NeighborhoodEntry {
                    name: name.to_string(),
                    zipcode: None,
                },
            );
        }

        let placement = place_all(&groups, &BoundaryLookup::new(), DEFAULT_MARGIN);

        assert!(placement.rows.is_empty());
        let warnings = warnings_mentioning("'KAYIP İLÇE'");
        assert_eq!(warnings.len(), 1, "warnings: {warnings:?}");
        assert!(
            warnings[0].contains("skipping 3 neighborhoods"),
            "{}",
            warnings[0]
        );
    }
}
