//! Fans a road segment out into one candidate per populated name slot.

use altnames_roads_models::{AliasCandidate, NameSlot, RoadSegment, has_letters};

/// One entry produced by [`expand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedName {
    /// The projected candidate.
    pub candidate: AliasCandidate,
    /// Whether the candidate carries a street type. `false` only for ACS
    /// names, which have none.
    pub requires_street_type: bool,
}

/// Expands `segment` into at most four candidates, in the order primary,
/// alias 1, alias 2, ACS. A slot is emitted only when its name is
/// non-empty.
///
/// Alias slots take the alias name and type and keep the segment's
/// postdirectional unless the alias name has no letters. The ACS slot takes
/// the ACS name and postdirectional and never has a street type.
#[must_use]
pub fn expand(segment: &RoadSegment) -> Vec<ExpandedName> {
    NameSlot::all()
        .iter()
        .filter_map(|slot| expand_slot(segment, *slot))
        .collect()
}

fn expand_slot(segment: &RoadSegment, slot: NameSlot) -> Option<ExpandedName> {
    let (name, street_type, postdir) = match slot {
        NameSlot::Primary => (
            segment.name.as_str(),
            Some(segment.street_type.clone()),
            Some(segment.postdir.clone()),
        ),
        NameSlot::Alias1 => alias(&segment.alias1_name, &segment.alias1_type, &segment.postdir),
        NameSlot::Alias2 => alias(&segment.alias2_name, &segment.alias2_type, &segment.postdir),
        NameSlot::Acs => (segment.acs_name.as_str(), None, Some(segment.acs_postdir.clone())),
    };

    if name.is_empty() {
        return None;
    }

    Some(ExpandedName {
        candidate: AliasCandidate {
            slot,
            address_system_left: segment.address_system_left.clone(),
            address_system_right: segment.address_system_right.clone(),
            range: segment.range,
            predir: segment.predir.clone(),
            name: name.to_string(),
            street_type,
            postdir,
            zip_left: segment.zip_left.clone(),
            zip_right: segment.zip_right.clone(),
            global_id: segment.global_id.clone(),
        },
        requires_street_type: slot != NameSlot::Acs,
    })
}

fn alias<'a>(
    name: &'a str,
    street_type: &str,
    postdir: &str,
) -> (&'a str, Option<String>, Option<String>) {
    // Numbered alias names carry no postdirectional.
    let postdir = has_letters(name).then(|| postdir.to_string());
    (name, Some(street_type.to_string()), postdir)
}

#[cfg(test)]
mod tests {
    use altnames_roads_models::{AddressRange, Geometry, RoadAttributes};

    use super::*;

    fn segment() -> RoadSegment {
        RoadSegment {
            object_id: 1,
            address_system_left: "A".to_string(),
            address_system_right: "B".to_string(),
            range: AddressRange::new(100, 199, 0, 0),
            predir: "N".to_string(),
            name: "MAIN".to_string(),
            street_type: "ST".to_string(),
            postdir: "E".to_string(),
            alias1_name: String::new(),
            alias1_type: String::new(),
            alias2_name: String::new(),
            alias2_type: String::new(),
            acs_name: String::new(),
            acs_postdir: String::new(),
            zip_left: "84101".to_string(),
            zip_right: "84102".to_string(),
            global_id: "{G}".to_string(),
            classification: "10".to_string(),
            geometry: Geometry::default(),
        }
    }

    fn slots(entries: &[ExpandedName]) -> Vec<NameSlot> {
        entries.iter().map(|e| e.candidate.slot).collect()
    }

    #[test]
    fn primary_only() {
        let entries = expand(&segment());

        assert_eq!(slots(&entries), vec![NameSlot::Primary]);
        let primary = &entries[0];
        assert!(primary.requires_street_type);
        assert_eq!(primary.candidate.name, "MAIN");
        assert_eq!(primary.candidate.street_type.as_deref(), Some("ST"));
        assert_eq!(primary.candidate.postdir.as_deref(), Some("E"));
    }

    #[test]
    fn emits_one_entry_per_populated_slot_in_order() {
        let mut seg = segment();
        seg.alias2_name = "STATE".to_string();
        seg.alias2_type = "HWY".to_string();
        seg.acs_name = "1300".to_string();
        seg.acs_postdir = "S".to_string();

        let entries = expand(&seg);

        assert_eq!(
            slots(&entries),
            vec![NameSlot::Primary, NameSlot::Alias2, NameSlot::Acs]
        );
        assert_eq!(entries[1].candidate.name, "STATE");
        assert_eq!(entries[1].candidate.street_type.as_deref(), Some("HWY"));
        assert_eq!(entries[1].candidate.postdir.as_deref(), Some("E"));
    }

    #[test]
    fn numeric_alias_drops_postdir() {
        let mut seg = segment();
        seg.alias1_name = "1300".to_string();
        seg.alias1_type = "ST".to_string();

        let alias = &expand(&seg)[1];

        assert_eq!(alias.candidate.slot, NameSlot::Alias1);
        assert_eq!(alias.candidate.postdir, None);
        assert_eq!(alias.candidate.street_type.as_deref(), Some("ST"));
    }

    #[test]
    fn acs_never_carries_a_street_type() {
        let mut seg = segment();
        seg.acs_name = "1300".to_string();
        seg.acs_postdir = "S".to_string();

        let acs = expand(&seg).pop().unwrap();

        assert_eq!(acs.candidate.slot, NameSlot::Acs);
        assert!(!acs.requires_street_type);
        assert_eq!(acs.candidate.street_type, None);
        assert_eq!(acs.candidate.postdir.as_deref(), Some("S"));

        let attrs = RoadAttributes::from(&acs.candidate);
        assert_eq!(attrs.street_type, "");
    }

    #[test]
    fn all_slots_populated_yields_four_entries() {
        let mut seg = segment();
        seg.alias1_name = "CENTER".to_string();
        seg.alias2_name = "STATE".to_string();
        seg.acs_name = "100".to_string();

        let entries = expand(&seg);

        assert_eq!(slots(&entries), NameSlot::all().to_vec());
        for entry in &entries {
            assert_eq!(entry.candidate.global_id, "{G}");
            assert_eq!(entry.candidate.predir, "N");
            assert_eq!(
                entry.requires_street_type,
                entry.candidate.street_type.is_some()
            );
        }
    }
}
