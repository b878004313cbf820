//! Address point records and their alt-name projection.

use serde::{Deserialize, Serialize};

use crate::has_letters;

/// Street names starting with this prefix are state highways and are never
/// alt-name candidates.
pub const HIGHWAY_PREFIX: &str = "HIGHWAY ";

/// An address point from the relational source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressPointRecord {
    /// Address system.
    pub system: String,
    /// House number.
    pub number: String,
    /// House number suffix (e.g. `"A"` in `"100A"`).
    pub number_suffix: String,
    /// Prefix direction.
    pub prefix_dir: String,
    /// Street name.
    pub street_name: String,
    /// Street type.
    pub street_type: String,
    /// Suffix direction.
    pub suffix_dir: String,
    /// City.
    pub city: String,
    /// ZIP code.
    pub zip: String,
    /// County identifier.
    pub county: String,
}

impl AddressPointRecord {
    /// Returns `true` if `other` is the same location under a different
    /// prefix direction.
    #[must_use]
    pub fn same_location_different_prefix(&self, other: &Self) -> bool {
        self.system == other.system
            && self.street_name == other.street_name
            && self.number == other.number
            && self.street_type == other.street_type
            && self.suffix_dir == other.suffix_dir
            && self.number_suffix == other.number_suffix
            && self.prefix_dir != other.prefix_dir
    }

    /// Returns `true` if this point may need an alt-name row: it has a
    /// prefix direction, an alphabetic street name, and is not a highway.
    #[must_use]
    pub fn is_alt_name_eligible(&self) -> bool {
        !self.prefix_dir.is_empty()
            && has_letters(&self.street_name)
            && !self.street_name.to_uppercase().starts_with(HIGHWAY_PREFIX)
    }

    /// Builds the join identifier by concatenating the trimmed parts.
    ///
    /// The result is not normalized: an empty suffix leaves a double space.
    #[must_use]
    pub fn raw_join_id(&self) -> String {
        let tail = format!("{} {}", self.street_type.trim(), self.suffix_dir.trim());
        format!(
            "{} | {} {} {} {} {}",
            self.system.trim(),
            self.number.trim(),
            self.number_suffix.trim(),
            self.prefix_dir.trim(),
            self.street_name.trim(),
            tail.trim(),
        )
    }
}

/// An address point that survived the anti-join, with its raw join
/// identifier as produced by the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressPointCandidate {
    /// The address point.
    pub record: AddressPointRecord,
    /// Join identifier before whitespace normalization.
    pub join_id: String,
}

/// A row of the address-point alt-names table (no prefix direction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltNameAddressPoint {
    /// Address system.
    pub system: String,
    /// House number.
    pub number: String,
    /// House number suffix.
    pub number_suffix: String,
    /// Street name.
    pub street_name: String,
    /// Street type.
    pub street_type: String,
    /// Suffix direction.
    pub suffix_dir: String,
    /// City.
    pub city: String,
    /// ZIP code.
    pub zip: String,
    /// County identifier.
    pub county: String,
    /// Normalized join identifier.
    pub join_id: String,
}

impl AltNameAddressPoint {
    /// Projects `record` into an alt-name row with the given join id.
    #[must_use]
    pub fn from_record(record: &AddressPointRecord, join_id: String) -> Self {
        Self {
            system: record.system.clone(),
            number: record.number.clone(),
            number_suffix: record.number_suffix.clone(),
            street_name: record.street_name.clone(),
            street_type: record.street_type.clone(),
            suffix_dir: record.suffix_dir.clone(),
            city: record.city.clone(),
            zip: record.zip.clone(),
            county: record.county.clone(),
            join_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(prefix: &str) -> AddressPointRecord {
        AddressPointRecord {
            system: "X".to_string(),
            number: "100".to_string(),
            prefix_dir: prefix.to_string(),
            street_name: "STATE".to_string(),
            street_type: "ST".to_string(),
            ..AddressPointRecord::default()
        }
    }

    #[test]
    fn detects_same_location_under_other_prefix() {
        assert!(point("N").same_location_different_prefix(&point("S")));
        assert!(!point("N").same_location_different_prefix(&point("N")));
    }

    #[test]
    fn different_number_suffix_is_a_different_location() {
        let mut other = point("S");
        other.number_suffix = "A".to_string();
        assert!(!point("N").same_location_different_prefix(&other));
    }

    #[test]
    fn eligibility_filters() {
        assert!(point("N").is_alt_name_eligible());
        assert!(!point("").is_alt_name_eligible());

        let mut numbered = point("N");
        numbered.street_name = "1300".to_string();
        assert!(!numbered.is_alt_name_eligible());

        let mut highway = point("N");
        highway.street_name = "HIGHWAY 89".to_string();
        assert!(!highway.is_alt_name_eligible());
    }

    #[test]
    fn raw_join_id_keeps_double_space_for_empty_suffix() {
        assert_eq!(point("N").raw_join_id(), "X | 100  N STATE ST");
    }
}
