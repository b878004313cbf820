#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road segment, alias, and address point types for alternate-name
//! generation.
//!
//! This crate contains only data types and simple pure helpers. It has no
//! storage or I/O dependencies.

pub mod address_points;
pub mod range;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use address_points::{AddressPointCandidate, AddressPointRecord, AltNameAddressPoint};
pub use range::{AddressRange, Envelope};

/// Cartographic classification codes that are never geocodable.
pub const EXCLUDED_CLASSIFICATIONS: &[&str] = &["1", "7", "99"];

/// Street names containing this marker are never geocodable.
pub const ROUNDABOUT_MARKER: &str = "ROUNDABOUT";

/// A single attribute value in the store's native representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Missing value.
    Null,
    /// Text value.
    Text(String),
    /// Integral number.
    Integer(i64),
    /// Floating-point number.
    Double(f64),
    /// Opaque binary payload (geometry).
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Returns the value rendered as text.
    ///
    /// `Null` and `Blob` render as an empty string. Whole-number doubles
    /// render without a fractional part so that `7.0` and `"7"` compare
    /// equal.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Null | Self::Blob(_) => String::new(),
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            #[allow(clippy::cast_possible_truncation)]
            Self::Double(d) if d.fract() == 0.0 && d.is_finite() => (*d as i64).to_string(),
            Self::Double(d) => d.to_string(),
        }
    }

    /// Returns the value as an address number.
    ///
    /// `Null` and blank text are `0` (the "not applicable" sentinel).
    /// Doubles are rounded to the nearest integer. Returns `None` for
    /// unparsable text and binary values.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Null => Some(0),
            Self::Integer(i) => Some(*i),
            #[allow(clippy::cast_possible_truncation)]
            Self::Double(d) if d.is_finite() => Some(d.round() as i64),
            Self::Double(_) | Self::Blob(_) => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0)
                } else {
                    trimmed
                        .parse::<i64>()
                        .ok()
                        .or_else(|| trimmed.parse::<f64>().ok().and_then(|d| Self::Double(d).as_number()))
                }
            }
        }
    }

    /// Returns `true` if this is [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Opaque geometry handle, copied forward verbatim and never inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry(pub Vec<u8>);

/// One record read from a source feature collection.
///
/// `values` are positional and line up with the source schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// Store-assigned identity of the record.
    pub object_id: i64,
    /// Attribute values in schema order.
    pub values: Vec<FieldValue>,
}

/// Which name field of a road segment an output record was built from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NameSlot {
    /// The segment's own street name.
    Primary,
    /// First alias name.
    Alias1,
    /// Second alias name.
    Alias2,
    /// ACS alternate (numbered-route) name.
    Acs,
}

impl NameSlot {
    /// All slots in expansion order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Primary, Self::Alias1, Self::Alias2, Self::Acs]
    }
}

/// An immutable road centerline record from the authoritative dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadSegment {
    /// Source object identity.
    pub object_id: i64,
    /// Address system on the left side.
    pub address_system_left: String,
    /// Address system on the right side.
    pub address_system_right: String,
    /// Address ranges for both sides.
    pub range: AddressRange,
    /// Predirectional (0-1 characters).
    pub predir: String,
    /// Primary street name.
    pub name: String,
    /// Primary street type.
    pub street_type: String,
    /// Postdirectional.
    pub postdir: String,
    /// First alias name.
    pub alias1_name: String,
    /// First alias street type.
    pub alias1_type: String,
    /// Second alias name.
    pub alias2_name: String,
    /// Second alias street type.
    pub alias2_type: String,
    /// ACS alternate name.
    pub acs_name: String,
    /// ACS postdirectional.
    pub acs_postdir: String,
    /// Left ZIP code.
    pub zip_left: String,
    /// Right ZIP code.
    pub zip_right: String,
    /// Stable external join identifier.
    pub global_id: String,
    /// Cartographic classification code.
    pub classification: String,
    /// Geometry, copied forward.
    pub geometry: Geometry,
}

impl RoadSegment {
    /// Returns `true` if this segment belongs in the geocoding dataset.
    ///
    /// A segment is geocodable when its classification is not excluded,
    /// at least one side has a non-zero range, the primary name is
    /// non-empty, and the name is not a roundabout.
    #[must_use]
    pub fn is_geocodable(&self) -> bool {
        !EXCLUDED_CLASSIFICATIONS.contains(&self.classification.trim())
            && self.range.has_addressable_side()
            && !self.name.is_empty()
            && !self.name.to_uppercase().contains(ROUNDABOUT_MARKER)
    }
}

/// A projection of a [`RoadSegment`] with its name fields taken from one
/// name slot.
///
/// `street_type` and `postdir` are `None` when the field was dropped for
/// this slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCandidate {
    /// Name slot this candidate was built from.
    pub slot: NameSlot,
    /// Address system on the left side.
    pub address_system_left: String,
    /// Address system on the right side.
    pub address_system_right: String,
    /// Address ranges for both sides.
    pub range: AddressRange,
    /// Predirectional.
    pub predir: String,
    /// Effective street name.
    pub name: String,
    /// Effective street type.
    pub street_type: Option<String>,
    /// Effective postdirectional.
    pub postdir: Option<String>,
    /// Left ZIP code.
    pub zip_left: String,
    /// Right ZIP code.
    pub zip_right: String,
    /// Join identifier of the source segment.
    pub global_id: String,
}

/// The attribute set persisted for every geocode, scratch, and alt-name
/// record.
///
/// Dropped fields are stored as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoadAttributes {
    /// Address system on the left side.
    pub address_system_left: String,
    /// Address system on the right side.
    pub address_system_right: String,
    /// Address ranges for both sides.
    pub range: AddressRange,
    /// Predirectional.
    pub predir: String,
    /// Street name.
    pub name: String,
    /// Street type.
    pub street_type: String,
    /// Postdirectional.
    pub postdir: String,
    /// Left ZIP code.
    pub zip_left: String,
    /// Right ZIP code.
    pub zip_right: String,
    /// Join identifier back to the source segment.
    pub global_id: String,
}

impl From<&AliasCandidate> for RoadAttributes {
    fn from(candidate: &AliasCandidate) -> Self {
        Self {
            address_system_left: candidate.address_system_left.clone(),
            address_system_right: candidate.address_system_right.clone(),
            range: candidate.range,
            predir: candidate.predir.clone(),
            name: candidate.name.clone(),
            street_type: candidate.street_type.clone().unwrap_or_default(),
            postdir: candidate.postdir.clone().unwrap_or_default(),
            zip_left: candidate.zip_left.clone(),
            zip_right: candidate.zip_right.clone(),
            global_id: candidate.global_id.clone(),
        }
    }
}

impl RoadAttributes {
    /// Returns `true` if this record must be checked for a cross-quadrant
    /// duplicate: it has a predirectional and an alphabetic name.
    ///
    /// Records without a predirectional are already represented without
    /// one and are never evaluated.
    #[must_use]
    pub fn needs_disambiguation(&self) -> bool {
        !self.predir.is_empty() && has_letters(&self.name)
    }

    /// The lookup key of "the same logical street, different quadrant".
    #[must_use]
    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            address_system_left: self.address_system_left.clone(),
            address_system_right: self.address_system_right.clone(),
            name: self.name.clone(),
            street_type: self.street_type.clone(),
            postdir: self.postdir.clone(),
            predir: self.predir.clone(),
        }
    }

    /// Projects this record into an alt-name row, dropping the
    /// predirectional.
    #[must_use]
    pub fn to_alt_name(&self) -> AltNameRoad {
        AltNameRoad {
            address_system_left: self.address_system_left.clone(),
            address_system_right: self.address_system_right.clone(),
            range: self.range,
            name: self.name.clone(),
            street_type: self.street_type.clone(),
            postdir: self.postdir.clone(),
            zip_left: self.zip_left.clone(),
            zip_right: self.zip_right.clone(),
            global_id: self.global_id.clone(),
        }
    }
}

/// Equality key used to find the same street in another quadrant.
///
/// Candidates match on equal systems, name, type, and postdirectional,
/// and on a predirectional different from `predir`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    /// Address system on the left side.
    pub address_system_left: String,
    /// Address system on the right side.
    pub address_system_right: String,
    /// Street name.
    pub name: String,
    /// Street type.
    pub street_type: String,
    /// Postdirectional.
    pub postdir: String,
    /// Predirectional that matches must differ from.
    pub predir: String,
}

impl MatchKey {
    /// Returns `true` if `attributes` is a possible candidate for this key.
    #[must_use]
    pub fn matches(&self, attributes: &RoadAttributes) -> bool {
        attributes.address_system_left == self.address_system_left
            && attributes.address_system_right == self.address_system_right
            && attributes.name == self.name
            && attributes.street_type == self.street_type
            && attributes.postdir == self.postdir
            && attributes.predir != self.predir
    }
}

/// A record persisted to the geocode feature collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeRoad {
    /// Projected attributes.
    pub attributes: RoadAttributes,
    /// Geometry copied from the source segment.
    pub geometry: Geometry,
}

/// A record read back from a store together with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRoad {
    /// Store-assigned identity.
    pub object_id: i64,
    /// Persisted attributes.
    pub attributes: RoadAttributes,
}

/// A row of the road alt-names table (no predirectional, no geometry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltNameRoad {
    /// Address system on the left side.
    pub address_system_left: String,
    /// Address system on the right side.
    pub address_system_right: String,
    /// Address ranges for both sides.
    pub range: AddressRange,
    /// Street name.
    pub name: String,
    /// Street type.
    pub street_type: String,
    /// Postdirectional.
    pub postdir: String,
    /// Left ZIP code.
    pub zip_left: String,
    /// Right ZIP code.
    pub zip_right: String,
    /// Join identifier back to the source segment.
    pub global_id: String,
}

/// Returns `true` if `s` contains at least one cased (alphabetic)
/// character.
///
/// Equivalent to `UPPER(s) <> s OR LOWER(s) <> s`.
#[must_use]
pub fn has_letters(s: &str) -> bool {
    s.chars().any(|c| c.is_uppercase() || c.is_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> RoadSegment {
        RoadSegment {
            object_id: 1,
            address_system_left: "SALT LAKE CITY".to_string(),
            address_system_right: "SALT LAKE CITY".to_string(),
            range: AddressRange::new(101, 199, 100, 198),
            predir: "N".to_string(),
            name: "MAIN".to_string(),
            street_type: "ST".to_string(),
            postdir: String::new(),
            alias1_name: String::new(),
            alias1_type: String::new(),
            alias2_name: String::new(),
            alias2_type: String::new(),
            acs_name: String::new(),
            acs_postdir: String::new(),
            zip_left: "84101".to_string(),
            zip_right: "84101".to_string(),
            global_id: "{A}".to_string(),
            classification: "10".to_string(),
            geometry: Geometry::default(),
        }
    }

    #[test]
    fn plain_segment_is_geocodable() {
        assert!(segment().is_geocodable());
    }

    #[test]
    fn excluded_classifications_are_not_geocodable() {
        for code in ["1", "7", "99"] {
            let mut seg = segment();
            seg.classification = code.to_string();
            assert!(!seg.is_geocodable(), "code {code} should be excluded");
        }
    }

    #[test]
    fn roundabouts_are_not_geocodable() {
        let mut seg = segment();
        seg.name = "MAIN ROUNDABOUT".to_string();
        assert!(!seg.is_geocodable());
    }

    #[test]
    fn unaddressed_segments_are_not_geocodable() {
        let mut seg = segment();
        seg.range = AddressRange::new(0, 0, 0, 0);
        assert!(!seg.is_geocodable());
    }

    #[test]
    fn unnamed_segments_are_not_geocodable() {
        let mut seg = segment();
        seg.name = String::new();
        assert!(!seg.is_geocodable());
    }

    #[test]
    fn has_letters_detects_alphabetic_names() {
        assert!(has_letters("MAIN"));
        assert!(has_letters("1300 E"));
        assert!(!has_letters("1300"));
        assert!(!has_letters(""));
    }

    #[test]
    fn match_key_requires_different_predir() {
        let attrs = RoadAttributes {
            address_system_left: "A".to_string(),
            address_system_right: "B".to_string(),
            predir: "N".to_string(),
            name: "MAIN".to_string(),
            street_type: "ST".to_string(),
            ..RoadAttributes::default()
        };
        let key = attrs.match_key();
        assert!(!key.matches(&attrs));

        let other = RoadAttributes {
            predir: "S".to_string(),
            ..attrs.clone()
        };
        assert!(key.matches(&other));

        let other_type = RoadAttributes {
            street_type: "AVE".to_string(),
            ..other
        };
        assert!(!key.matches(&other_type));
    }

    #[test]
    fn alt_name_drops_predir() {
        let attrs = RoadAttributes {
            predir: "N".to_string(),
            name: "MAIN".to_string(),
            ..RoadAttributes::default()
        };
        let alt = attrs.to_alt_name();
        assert_eq!(alt.name, "MAIN");
    }

    #[test]
    fn field_value_text_rendering() {
        assert_eq!(FieldValue::Double(7.0).as_text(), "7");
        assert_eq!(FieldValue::Integer(99).as_text(), "99");
        assert_eq!(FieldValue::Null.as_text(), "");
    }

    #[test]
    fn field_value_numbers() {
        assert_eq!(FieldValue::Null.as_number(), Some(0));
        assert_eq!(FieldValue::Double(150.0).as_number(), Some(150));
        assert_eq!(FieldValue::Text(" 42 ".to_string()).as_number(), Some(42));
        assert_eq!(FieldValue::Text(String::new()).as_number(), Some(0));
        assert_eq!(FieldValue::Text("abc".to_string()).as_number(), None);
    }

    #[test]
    fn name_slot_round_trips_through_strum() {
        assert_eq!(NameSlot::Alias1.as_ref(), "ALIAS1");
        assert_eq!("ACS".parse::<NameSlot>().ok(), Some(NameSlot::Acs));
    }
}
