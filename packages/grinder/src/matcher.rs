//! Cross-quadrant duplicate detection.
//!
//! A scratch record with a predirectional (`N MAIN ST`) is a duplicate when
//! the same street under another predirectional (`S MAIN ST`) already covers
//! its address range, or falls inside it. Duplicates are suppressed; the
//! rest are written to the alt-names table without their predirectional.

use altnames_roads_models::StoredRoad;
use altnames_store::{OutputWorkspace, StoreError};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// Which containment test found the duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MatchReason {
    /// The candidate's envelope touches the other record's stored range.
    FitsInLarger,
    /// The other record's envelope touches the candidate's stored range.
    SmallerFitsWithin,
}

/// A duplicate found for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateMatch {
    /// Scratch object id of the record that covers the candidate.
    pub matched_object_id: i64,
    /// The test that matched.
    pub reason: MatchReason,
}

/// Searches the scratch store of a workspace for cross-quadrant duplicates.
pub struct RangeOverlapMatcher<'a, W: OutputWorkspace> {
    workspace: &'a W,
}

impl<'a, W: OutputWorkspace> RangeOverlapMatcher<'a, W> {
    /// Creates a matcher over `workspace`'s scratch store.
    #[must_use]
    pub const fn new(workspace: &'a W) -> Self {
        Self { workspace }
    }

    /// Finds a record that makes `candidate` a duplicate.
    ///
    /// Possible matches share both address systems, name, street type, and
    /// postdirectional with `candidate` but have a different
    /// predirectional. They are tried in store order and the first hit
    /// wins. For each one, the candidate's envelope is tested against the
    /// match's stored range, then the match's envelope against the
    /// candidate's stored range. No possible matches means no duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a scratch query fails.
    pub fn find_duplicate(
        &self,
        candidate: &StoredRoad,
    ) -> Result<Option<DuplicateMatch>, StoreError> {
        let possible = self
            .workspace
            .possible_candidates(&candidate.attributes.match_key())?;

        if possible.is_empty() {
            log::debug!(
                "No cross-quadrant match for scratch record {}",
                candidate.object_id
            );
            return Ok(None);
        }

        let envelope = candidate.attributes.range.envelope();

        for other in &possible {
            if self.workspace.range_contains(other.object_id, envelope)? {
                return Ok(Some(DuplicateMatch {
                    matched_object_id: other.object_id,
                    reason: MatchReason::FitsInLarger,
                }));
            }

            let other_envelope = other.attributes.range.envelope();
            if self
                .workspace
                .range_contains(candidate.object_id, other_envelope)?
            {
                return Ok(Some(DuplicateMatch {
                    matched_object_id: other.object_id,
                    reason: MatchReason::SmallerFitsWithin,
                }));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use altnames_roads_models::{AddressRange, RoadAttributes};
    use altnames_store::InMemoryWorkspace;

    use super::*;

    fn attrs(predir: &str, range: AddressRange) -> RoadAttributes {
        RoadAttributes {
            address_system_left: "A".to_string(),
            address_system_right: "B".to_string(),
            range,
            predir: predir.to_string(),
            name: "MAIN".to_string(),
            street_type: "ST".to_string(),
            ..RoadAttributes::default()
        }
    }

    fn insert(ws: &mut InMemoryWorkspace, attributes: RoadAttributes) -> StoredRoad {
        let object_id = ws.insert_scratch_road(&attributes).unwrap();
        StoredRoad {
            object_id,
            attributes,
        }
    }

    #[test]
    fn no_possible_candidates_keeps() {
        let mut ws = InMemoryWorkspace::new();
        let north = insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));

        assert_eq!(RangeOverlapMatcher::new(&ws).find_duplicate(&north).unwrap(), None);
    }

    #[test]
    fn identical_ranges_fit_in_larger() {
        let mut ws = InMemoryWorkspace::new();
        let north = insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));
        let south = insert(&mut ws, attrs("S", AddressRange::new(100, 199, 0, 0)));

        let found = RangeOverlapMatcher::new(&ws).find_duplicate(&south).unwrap();

        assert_eq!(
            found,
            Some(DuplicateMatch {
                matched_object_id: north.object_id,
                reason: MatchReason::FitsInLarger,
            })
        );
    }

    #[test]
    fn disjoint_ranges_are_kept() {
        let mut ws = InMemoryWorkspace::new();
        let north = insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));
        let south = insert(&mut ws, attrs("S", AddressRange::new(300, 399, 0, 0)));

        let matcher = RangeOverlapMatcher::new(&ws);
        assert_eq!(matcher.find_duplicate(&north).unwrap(), None);
        assert_eq!(matcher.find_duplicate(&south).unwrap(), None);
    }

    #[test]
    fn candidate_inside_other_range_fits_in_larger() {
        let mut ws = InMemoryWorkspace::new();
        let large = insert(&mut ws, attrs("N", AddressRange::new(100, 999, 0, 0)));
        let small = insert(&mut ws, attrs("S", AddressRange::new(200, 299, 0, 0)));

        let found = RangeOverlapMatcher::new(&ws)
            .find_duplicate(&small)
            .unwrap()
            .unwrap();

        assert_eq!(found.matched_object_id, large.object_id);
        assert_eq!(found.reason, MatchReason::FitsInLarger);
    }

    #[test]
    fn other_range_inside_candidate_fits_within() {
        // The candidate's envelope [100, 999] has neither endpoint inside
        // [200, 299], but [200, 299] is inside the candidate's left range.
        let mut ws = InMemoryWorkspace::new();
        let large = insert(&mut ws, attrs("N", AddressRange::new(101, 999, 100, 998)));
        let small = insert(&mut ws, attrs("S", AddressRange::new(200, 299, 0, 0)));

        let found = RangeOverlapMatcher::new(&ws)
            .find_duplicate(&large)
            .unwrap()
            .unwrap();

        assert_eq!(found.matched_object_id, small.object_id);
        assert_eq!(found.reason, MatchReason::SmallerFitsWithin);
    }

    #[test]
    fn containment_is_found_from_both_sides() {
        let mut ws = InMemoryWorkspace::new();
        let a = insert(&mut ws, attrs("N", AddressRange::new(100, 999, 0, 0)));
        let b = insert(&mut ws, attrs("S", AddressRange::new(300, 400, 0, 0)));

        let matcher = RangeOverlapMatcher::new(&ws);
        assert!(matcher.find_duplicate(&a).unwrap().is_some());
        assert!(matcher.find_duplicate(&b).unwrap().is_some());
    }

    #[test]
    fn same_predir_is_never_a_match() {
        let mut ws = InMemoryWorkspace::new();
        insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));
        let twin = insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));

        assert_eq!(RangeOverlapMatcher::new(&ws).find_duplicate(&twin).unwrap(), None);
    }

    #[test]
    fn different_street_type_is_never_a_match() {
        let mut ws = InMemoryWorkspace::new();
        let mut avenue = attrs("S", AddressRange::new(100, 199, 0, 0));
        avenue.street_type = "AVE".to_string();
        insert(&mut ws, avenue);
        let north = insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));

        assert_eq!(RangeOverlapMatcher::new(&ws).find_duplicate(&north).unwrap(), None);
    }

    #[test]
    fn first_matching_candidate_wins() {
        let mut ws = InMemoryWorkspace::new();
        let north = insert(&mut ws, attrs("N", AddressRange::new(100, 199, 0, 0)));
        let south = insert(&mut ws, attrs("S", AddressRange::new(100, 199, 0, 0)));
        insert(&mut ws, attrs("E", AddressRange::new(100, 199, 0, 0)));

        let found = RangeOverlapMatcher::new(&ws)
            .find_duplicate(&north)
            .unwrap()
            .unwrap();

        assert_eq!(found.matched_object_id, south.object_id);
    }
}
