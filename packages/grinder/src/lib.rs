#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alternate-name generation for a geocoding index.
//!
//! A run has up to three transactional phases:
//!
//! 1. every geocodable source segment is expanded into one record per
//!    populated name slot ([`expand`]); each is written to the geocode table
//!    and alias/ACS records are mirrored into a scratch table;
//! 2. each scratch record with a predirectional is checked for a
//!    cross-quadrant duplicate ([`matcher`]); survivors are written to the
//!    road alt-names table without their predirectional;
//! 3. address points that exist under only one prefix direction are written
//!    to the address point alt-names table ([`address_points`]).
//!
//! Each phase commits on its own, so a failure in a later phase keeps the
//! earlier phases' output.

pub mod address_points;
pub mod config;
pub mod events;
pub mod expand;
pub mod matcher;
pub mod progress;
pub mod roads;

use altnames_schema::SchemaError;
use altnames_store::{EditSession, OutputWorkspace, StoreError};

pub use address_points::{AddressPointsSummary, grind_address_points, normalize_join_id};
pub use config::{ConfigError, GrindConfig};
pub use events::{EventSink, LogSink, Phase, RecordingSink, RunEvent};
pub use matcher::{DuplicateMatch, MatchReason, RangeOverlapMatcher};
pub use roads::{RoadsOptions, RoadsSummary, grind_roads};

/// Errors that abort a run or a phase.
#[derive(Debug, thiserror::Error)]
pub enum GrindError {
    /// A required input is missing.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// Description of what is missing.
        message: String,
    },

    /// Source rows have nulls in fields that must be populated.
    #[error("Integrity check failed: {count} source rows have nulls in {fields}")]
    IntegrityCheck {
        /// Offending row count.
        count: u64,
        /// Checked fields, comma separated.
        fields: String,
    },

    /// The source schema is missing fields.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A store operation outside a single record failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Runs `body` inside one edit session on `workspace`.
///
/// `body` returns the number of rows it wrote. The session commits when
/// `body` succeeds and rolls back when it fails; either outcome is reported
/// to `sink`.
fn in_edit_session<W, F>(
    workspace: &mut W,
    phase: Phase,
    sink: &mut dyn EventSink,
    body: F,
) -> Result<u64, GrindError>
where
    W: OutputWorkspace,
    F: FnOnce(&mut EditSession<'_, W>, &mut dyn EventSink) -> Result<u64, GrindError>,
{
    let mut session = EditSession::begin(workspace)?;
    sink.emit(RunEvent::PhaseStarted { phase });

    let written = match body(&mut session, sink) {
        Ok(written) => written,
        Err(e) => {
            if let Err(rollback) = session.rollback() {
                log::error!("Failed to roll back {phase}: {rollback}");
            }
            sink.emit(RunEvent::PhaseRolledBack {
                phase,
                reason: e.to_string(),
            });
            return Err(e);
        }
    };

    if let Err(e) = session.commit() {
        sink.emit(RunEvent::PhaseRolledBack {
            phase,
            reason: e.to_string(),
        });
        return Err(e.into());
    }

    sink.emit(RunEvent::PhaseCommitted { phase, written });
    Ok(written)
}

#[cfg(test)]
mod tests {
    use altnames_roads_models::RoadAttributes;
    use altnames_store::InMemoryWorkspace;

    use super::*;

    #[test]
    fn successful_body_commits() {
        let mut ws = InMemoryWorkspace::new();
        let mut sink = RecordingSink::new();

        let written = in_edit_session(&mut ws, Phase::GeocodeRoads, &mut sink, |session, _| {
            session.insert_scratch_road(&RoadAttributes::default())?;
            Ok(1)
        })
        .unwrap();

        assert_eq!(written, 1);
        assert_eq!(ws.scratch_roads().len(), 1);
        assert_eq!(
            sink.events.last(),
            Some(&RunEvent::PhaseCommitted {
                phase: Phase::GeocodeRoads,
                written: 1
            })
        );
    }

    #[test]
    fn failing_body_rolls_back() {
        let mut ws = InMemoryWorkspace::new();
        let mut sink = RecordingSink::new();

        let result = in_edit_session(&mut ws, Phase::AltNamesRoads, &mut sink, |session, _| {
            session.insert_scratch_road(&RoadAttributes::default())?;
            Err(GrindError::Precondition {
                message: "boom".to_string(),
            })
        });

        assert!(result.is_err());
        assert!(!ws.is_editing());
        assert!(ws.scratch_roads().is_empty());
        assert_eq!(
            sink.count(|e| matches!(e, RunEvent::PhaseRolledBack { phase: Phase::AltNamesRoads, .. })),
            1
        );
    }
}
