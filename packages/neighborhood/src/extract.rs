//! Scans raw text for neighborhood tuples.
//!
//! The dump is not parsed as SQL. Every `('` opening is a candidate tuple;
//! the scanner either reads a well-formed record there or reports why it
//! skipped the candidate, so dropped segments stay countable.

use std::sync::LazyLock;

use district_seed_neighborhood_models::RawRecord;
use regex::Regex;
use strum_macros::{AsRefStr, Display};

/// Literal that opens every candidate tuple.
const TUPLE_OPEN: &str = "('";

/// A complete tuple anchored at the candidate offset.
///
/// Five quoted fields, then a postal code slot holding digits, `NULL`, or
/// a quoted value.
static TUPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\('([^']+)','([^']+)','([^']+)','([^']+)','([^']+)',(?:(\d+)|NULL|'([^']*)')\)",
    )
    .expect("valid regex")
});

/// Why a candidate tuple was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// The text at the candidate does not have the expected tuple shape.
    Malformed,
    /// A well-formed tuple for some other region.
    ForeignRegion,
}

/// Result of scanning one candidate position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A well-formed tuple for the target region.
    Record(RawRecord),
    /// The candidate at byte `offset` was skipped.
    Skipped {
        /// Byte offset of the candidate within the text.
        offset: usize,
        /// Why it was skipped.
        reason: SkipReason,
    },
}

/// Lazy scanner over every candidate tuple in a text blob.
pub struct RecordScanner<'a> {
    text: &'a str,
    region: &'a str,
    cursor: usize,
}

impl<'a> RecordScanner<'a> {
    /// Creates a scanner that keeps only tuples whose region field equals
    /// `region`.
    #[must_use]
    pub const fn new(text: &'a str, region: &'a str) -> Self {
        Self {
            text,
            region,
            cursor: 0,
        }
    }
}

impl Iterator for RecordScanner<'_> {
    type Item = ScanOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.cursor + self.text.get(self.cursor..)?.find(TUPLE_OPEN)?;
        let candidate = &self.text[offset..];

        let Some(caps) = TUPLE_RE.captures(candidate) else {
            // Step past the '(' only; a real tuple may start inside this one.
            self.cursor = offset + 1;
            return Some(ScanOutcome::Skipped {
                offset,
                reason: SkipReason::Malformed,
            });
        };

        self.cursor = offset + caps[0].len();

        if &caps[2] != self.region {
            return Some(ScanOutcome::Skipped {
                offset,
                reason: SkipReason::ForeignRegion,
            });
        }

        let zipcode = caps
            .get(6)
            .or_else(|| caps.get(7))
            .and_then(|m| parse_zipcode(m.as_str()));

        Some(ScanOutcome::Record(RawRecord {
            record_id: caps[1].to_string(),
            region: caps[2].to_string(),
            district: caps[3].to_string(),
            neighborhood: caps[4].to_string(),
            town: caps[5].to_string(),
            zipcode,
        }))
    }
}

/// Parses a postal code that consists solely of ASCII digits.
///
/// Anything else (empty, signed, alphanumeric, or too large for `i64`)
/// yields `None` rather than an error.
#[must_use]
pub fn parse_zipcode(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// All records for the target region, plus skip counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Records in text order.
    pub records: Vec<RawRecord>,
    /// Well-formed tuples belonging to another region.
    pub foreign_region: u64,
    /// Candidates that did not have the tuple shape.
    pub malformed: u64,
}

/// Scans the full text and collects records for `region`.
#[must_use]
pub fn extract_records(text: &str, region: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for outcome in RecordScanner::new(text, region) {
        match outcome {
            ScanOutcome::Record(record) => extraction.records.push(record),
            ScanOutcome::Skipped { offset, reason } => {
                log::trace!("skipped candidate at byte {offset}: {reason}");
                match reason {
                    SkipReason::Malformed => extraction.malformed += 1,
                    SkipReason::ForeignRegion => extraction.foreign_region += 1,
                }
            }
        }
    }

    log::info!(
        "Extracted {} {region} records ({} other-region, {} malformed)",
        extraction.records.len(),
        extraction.foreign_region,
        extraction.malformed,
    );

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: &str = "İstanbul";

    #[test]
    fn extracts_numeric_and_null_zipcodes() {
        let text = "INSERT INTO `mahalle` VALUES \
            ('1','İstanbul','ADALAR','Burgazada Mah.','Adalar',34975),\
            ('2','İstanbul','ADALAR','Heybeliada Mah.','Adalar',NULL);";

        let extraction = extract_records(text, REGION);

        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].record_id, "1");
        assert_eq!(extraction.records[0].neighborhood, "Burgazada Mah.");
        assert_eq!(extraction.records[0].town, "Adalar");
        assert_eq!(extraction.records[0].zipcode, Some(34975));
        assert_eq!(extraction.records[1].zipcode, None);
    }

    #[test]
    fn excludes_other_regions() {
        let text = "('1','Ankara','X','A','Çankaya',6100),('2','İstanbul','Y','B','Fatih',34000)";

        let extraction = extract_records(text, REGION);

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].neighborhood, "B");
        assert_eq!(extraction.foreign_region, 1);
        assert_eq!(extraction.malformed, 0);
    }

    #[test]
    fn counts_malformed_candidates() {
        // Missing town field, then an empty id.
        let text = "('1','İstanbul','Y','B',34000) ('','İstanbul','Y','B','Fatih',1) \
                    ('3','İstanbul','Y','C','Fatih',34001)";

        let extraction = extract_records(text, REGION);

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].record_id, "3");
        assert_eq!(extraction.malformed, 2);
    }

    #[test]
    fn quoted_non_numeric_zipcode_becomes_none() {
        let text = "('1','İstanbul','Y','B','Fatih','N/A'),('2','İstanbul','Y','C','Fatih','34010')";

        let extraction = extract_records(text, REGION);

        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].zipcode, None);
        assert_eq!(extraction.records[1].zipcode, Some(34010));
    }

    #[test]
    fn parentheses_inside_fields_are_kept() {
        let text = "('9','İstanbul','Y','Kemal (Merkez) Mah.','Fatih',34000)";

        let extraction = extract_records(text, REGION);

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].neighborhood, "Kemal (Merkez) Mah.");
    }

    #[test]
    fn scanner_reports_offsets_lazily() {
        let text = "xx('a') ('1','İstanbul','Y','B','Fatih',NULL)";
        let mut scanner = RecordScanner::new(text, REGION);

        assert_eq!(
            scanner.next(),
            Some(ScanOutcome::Skipped {
                offset: 2,
                reason: SkipReason::Malformed,
            })
        );
        assert!(matches!(scanner.next(), Some(ScanOutcome::Record(_))));
        assert_eq!(scanner.next(), None);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(extract_records("", REGION), Extraction::default());
    }

    #[test]
    fn parse_zipcode_rejects_non_digits() {
        assert_eq!(parse_zipcode("34000"), Some(34000));
        assert_eq!(parse_zipcode(" 34000 "), Some(34000));
        assert_eq!(parse_zipcode("-1"), None);
        assert_eq!(parse_zipcode("34A00"), None);
        assert_eq!(parse_zipcode(""), None);
        assert_eq!(parse_zipcode("99999999999999999999999"), None);
    }
}
