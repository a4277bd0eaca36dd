//! Groups normalized records by canonical district.
//!
//! Both district order and per-district neighborhood order follow first
//! appearance in the input. Neighborhood order is observable: it is the
//! placement index handed to [`crate::placement`].

use std::collections::BTreeMap;

use district_seed_neighborhood_models::{DistrictField, NeighborhoodEntry, RawRecord};

use crate::normalize::DistrictNormalizer;

/// One district and its neighborhoods in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictGroup {
    /// Canonical district name.
    pub district: String,
    /// Neighborhoods in first-seen order.
    pub neighborhoods: Vec<NeighborhoodEntry>,
}

/// Insertion-ordered mapping from canonical district to neighborhoods.
#[derive(Debug, Clone, Default)]
pub struct DistrictGroups {
    groups: Vec<DistrictGroup>,
    positions: BTreeMap<String, usize>,
}

impl DistrictGroups {
    /// Appends a neighborhood to `district`, creating the group on first
    /// sight.
    pub fn push(&mut self, district: String, entry: NeighborhoodEntry) {
        if let Some(&idx) = self.positions.get(&district) {
            self.groups[idx].neighborhoods.push(entry);
            return;
        }

        self.positions.insert(district.clone(), self.groups.len());
        self.groups.push(DistrictGroup {
            district,
            neighborhoods: vec![entry],
        });
    }

    /// Looks up a district's group.
    #[must_use]
    pub fn get(&self, district: &str) -> Option<&DistrictGroup> {
        self.positions.get(district).map(|&idx| &self.groups[idx])
    }

    /// Iterates groups in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, DistrictGroup> {
        self.groups.iter()
    }

    /// Number of districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no records were grouped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total neighborhoods across all districts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.neighborhoods.len()).sum()
    }
}

impl<'a> IntoIterator for &'a DistrictGroups {
    type Item = &'a DistrictGroup;
    type IntoIter = std::slice::Iter<'a, DistrictGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Canonicalizes each record's district and groups the records.
#[must_use]
pub fn group_by_district(
    records: impl IntoIterator<Item = RawRecord>,
    normalizer: &DistrictNormalizer,
    field: DistrictField,
) -> DistrictGroups {
    let mut groups = DistrictGroups::default();

    for record in records {
        let district = normalizer.canonicalize(record.district_source(field));
        groups.push(
            district,
            NeighborhoodEntry {
                name: record.neighborhood,
                zipcode: record.zipcode,
            },
        );
    }

    log::info!(
        "Grouped {} neighborhoods into {} districts",
        groups.total(),
        groups.len()
    );

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{AliasTable, DistrictNormalizer};
    use district_seed_neighborhood_models::AliasEntry;

    fn record(id: &str, town: &str, name: &str, zipcode: Option<i64>) -> RawRecord {
        RawRecord {
            record_id: id.to_string(),
            region: "İstanbul".to_string(),
            district: "AREA".to_string(),
            neighborhood: name.to_string(),
            town: town.to_string(),
            zipcode,
        }
    }

    fn normalizer() -> DistrictNormalizer {
        DistrictNormalizer::new(
            AliasTable::from_entries([AliasEntry {
                alias: "FATIH".to_string(),
                canonical: "FATİH".to_string(),
            }])
            .unwrap(),
        )
    }

    #[test]
    fn preserves_first_seen_order() {
        let groups = group_by_district(
            vec![
                record("1", "Kadıköy", "Moda", Some(34710)),
                record("2", "Fatih", "Balat", None),
                record("3", "Kadıköy", "Fenerbahçe", None),
                record("4", "FATİH", "Fener", Some(34220)),
            ],
            &normalizer(),
            DistrictField::Town,
        );

        let districts: Vec<&str> = groups.iter().map(|g| g.district.as_str()).collect();
        assert_eq!(districts, ["KADIKÖY", "FATİH"]);

        let fatih: Vec<&str> = groups
            .get("FATİH")
            .unwrap()
            .neighborhoods
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(fatih, ["Balat", "Fener"]);
        assert_eq!(groups.get("FATİH").unwrap().neighborhoods[1].zipcode, Some(34220));
    }

    #[test]
    fn total_matches_input_count() {
        let records: Vec<RawRecord> = (0..25)
            .map(|i| record(&i.to_string(), ["A", "B", "C"][i % 3], &format!("N{i}"), None))
            .collect();
        let count = records.len();

        let groups = group_by_district(records, &normalizer(), DistrictField::Town);

        assert_eq!(groups.total(), count);
        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups.iter().map(|g| g.neighborhoods.len()).sum::<usize>(),
            count
        );
    }

    #[test]
    fn groups_by_selected_field() {
        let groups = group_by_district(
            vec![record("1", "Kadıköy", "Moda", None)],
            &normalizer(),
            DistrictField::District,
        );

        assert!(groups.get("AREA").is_some());
        assert!(groups.get("KADIKÖY").is_none());
    }

    #[test]
    fn repeated_names_are_kept() {
        let groups = group_by_district(
            vec![record("1", "A", "X", None), record("2", "A", "X", None)],
            &normalizer(),
            DistrictField::Town,
        );

        assert_eq!(groups.get("A").unwrap().neighborhoods.len(), 2);
    }

    #[test]
    fn empty_input_is_empty() {
        let groups = group_by_district(Vec::new(), &normalizer(), DistrictField::Town);
        assert!(groups.is_empty());
        assert_eq!(groups.total(), 0);
    }
}
