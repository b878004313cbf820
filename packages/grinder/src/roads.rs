//! Geocode and road alt-names table building.
//!
//! [`grind_roads`] runs the first two phases of a run. Phase one reads
//! every source segment, expands the geocodable ones, and writes each entry
//! to the geocode table and (alias/ACS entries, or every entry when
//! mirroring) to the scratch table. Phase two runs the
//! [`RangeOverlapMatcher`] over the scratch records that carry a
//! predirectional and writes the survivors to the road alt-names table.
//!
//! A failed insert skips that record only. With the DuckDB workspace a
//! failed statement also aborts the open transaction, so the commit of
//! that phase is refused and the whole phase rolls back.

use std::collections::BTreeSet;

use altnames_roads_models::{GeocodeRoad, NameSlot, RoadAttributes, RoadSegment};
use altnames_schema::{extract, roads::DEFAULT_GEOMETRY_FIELD, roads::RoadFieldIndex};
use altnames_store::{OutputWorkspace, RoadSource};

use crate::events::{EventSink, Phase, RunEvent, SkipReason};
use crate::expand::expand;
use crate::matcher::RangeOverlapMatcher;
use crate::progress::ProgressCallback;
use crate::{GrindError, in_edit_session};

/// Options for [`grind_roads`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadsOptions {
    /// Name of the geometry field in the source.
    pub geometry_field: String,
    /// Address systems to process. Empty means all.
    pub address_systems: BTreeSet<String>,
    /// Also mirror primary-name entries into the scratch table.
    pub mirror_primary_names: bool,
}

impl Default for RoadsOptions {
    fn default() -> Self {
        Self {
            geometry_field: DEFAULT_GEOMETRY_FIELD.to_string(),
            address_systems: BTreeSet::new(),
            mirror_primary_names: false,
        }
    }
}

impl RoadsOptions {
    /// Returns `true` if `segment` passes the address-system restriction.
    #[must_use]
    pub fn admits(&self, segment: &RoadSegment) -> bool {
        self.address_systems.is_empty()
            || self.address_systems.contains(&segment.address_system_left)
            || self.address_systems.contains(&segment.address_system_right)
    }

    const fn mirrors(&self, slot: NameSlot) -> bool {
        self.mirror_primary_names || !matches!(slot, NameSlot::Primary)
    }
}

/// Counters for one [`grind_roads`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoadsSummary {
    pub segments_read: u64,
    pub segments_skipped: u64,
    pub records_failed: u64,
    pub geocode_written: u64,
    pub scratch_written: u64,
    pub candidates_evaluated: u64,
    pub kept: u64,
    pub suppressed: u64,
    pub alt_names_failed: u64,
}

/// Builds the geocode, scratch, and road alt-names tables from `source`.
///
/// Existing output tables are archived first. The geocode phase and the
/// alt-names phase commit separately: if the alt-names phase fails, the
/// geocode and scratch tables stay committed.
///
/// # Errors
///
/// * [`GrindError::Schema`] if the source lacks a roads field
/// * [`GrindError::IntegrityCheck`] if a required field has nulls
/// * [`GrindError::Store`] if a phase fails to begin, commit, or query
pub fn grind_roads<S, W>(
    source: &S,
    workspace: &mut W,
    options: &RoadsOptions,
    sink: &mut dyn EventSink,
    progress: &dyn ProgressCallback,
) -> Result<RoadsSummary, GrindError>
where
    S: RoadSource,
    W: OutputWorkspace,
{
    let index = RoadFieldIndex::build(&source.schema()?, &options.geometry_field)?;

    let required = index.version().required_fields();
    let nulls = source.null_value_count(&required)?;
    if nulls > 0 {
        return Err(GrindError::IntegrityCheck {
            count: nulls,
            fields: required.join(", "),
        });
    }

    workspace.prepare_road_outputs()?;

    let mut summary = RoadsSummary::default();

    progress.set_total(source.row_count()?);
    progress.set_position(0);
    progress.set_message("Expanding road segments".to_string());

    in_edit_session(workspace, Phase::GeocodeRoads, sink, |session, sink| {
        source.for_each_row::<GrindError, _>(|row| {
            progress.inc(1);
            summary.segments_read += 1;

            let segment = match index.decode(&row) {
                Ok(segment) => segment,
                Err(e) => {
                    summary.records_failed += 1;
                    sink.emit(RunEvent::RecordFailed {
                        phase: Phase::GeocodeRoads,
                        record: row.object_id.to_string(),
                        message: format!("{e} [{}]", extract(&row, index.fields())),
                    });
                    return Ok(());
                }
            };

            let skip = if !segment.is_geocodable() {
                Some(SkipReason::NotGeocodable)
            } else if !options.admits(&segment) {
                Some(SkipReason::AddressSystemExcluded)
            } else {
                None
            };
            if let Some(reason) = skip {
                summary.segments_skipped += 1;
                sink.emit(RunEvent::SegmentSkipped {
                    object_id: segment.object_id,
                    reason,
                });
                return Ok(());
            }

            for entry in expand(&segment) {
                let slot = entry.candidate.slot;
                let attributes = RoadAttributes::from(&entry.candidate);
                let record = format!("{} ({slot})", segment.object_id);

                let geocode = GeocodeRoad {
                    attributes,
                    geometry: segment.geometry.clone(),
                };
                if let Err(e) = session.insert_geocode_road(&geocode) {
                    summary.records_failed += 1;
                    sink.emit(RunEvent::RecordFailed {
                        phase: Phase::GeocodeRoads,
                        record,
                        message: format!("geocode insert: {e}"),
                    });
                    continue;
                }
                summary.geocode_written += 1;

                if !options.mirrors(slot) {
                    continue;
                }
                match session.insert_scratch_road(&geocode.attributes) {
                    Ok(_) => summary.scratch_written += 1,
                    Err(e) => {
                        summary.records_failed += 1;
                        sink.emit(RunEvent::RecordFailed {
                            phase: Phase::GeocodeRoads,
                            record,
                            message: format!("scratch insert: {e}"),
                        });
                    }
                }
            }

            Ok(())
        })?;

        Ok(summary.geocode_written + summary.scratch_written)
    })?;

    workspace.create_scratch_indexes()?;

    in_edit_session(workspace, Phase::AltNamesRoads, sink, |session, sink| {
        let candidates = session.scratch_needing_disambiguation()?;
        log::info!(
            "{} scratch records need cross-quadrant disambiguation",
            candidates.len()
        );

        progress.set_total(candidates.len() as u64);
        progress.set_position(0);
        progress.set_message("Matching cross-quadrant names".to_string());

        for candidate in &candidates {
            progress.inc(1);
            summary.candidates_evaluated += 1;

            let found = RangeOverlapMatcher::new(&**session).find_duplicate(candidate)?;

            if let Some(found) = found {
                summary.suppressed += 1;
                sink.emit(RunEvent::CandidateSuppressed {
                    object_id: candidate.object_id,
                    matched_object_id: found.matched_object_id,
                    reason: found.reason,
                });
                continue;
            }

            match session.insert_alt_name_road(&candidate.attributes.to_alt_name()) {
                Ok(()) => {
                    summary.kept += 1;
                    sink.emit(RunEvent::CandidateKept {
                        object_id: candidate.object_id,
                        global_id: candidate.attributes.global_id.clone(),
                    });
                }
                Err(e) => {
                    summary.alt_names_failed += 1;
                    sink.emit(RunEvent::RecordFailed {
                        phase: Phase::AltNamesRoads,
                        record: candidate.object_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(summary.kept)
    })?;

    progress.finish_and_clear();

    log::info!(
        "Roads: {} segments read, {} skipped, {} failed; {} geocode and {} scratch records; \
         {} candidates evaluated, {} kept, {} suppressed",
        summary.segments_read,
        summary.segments_skipped,
        summary.records_failed,
        summary.geocode_written,
        summary.scratch_written,
        summary.candidates_evaluated,
        summary.kept,
        summary.suppressed,
    );

    Ok(summary)
}
