//! Per-record decisions and phase boundaries reported during a run.

use strum_macros::{AsRefStr, Display};

use crate::matcher::MatchReason;

/// A transactional phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    /// Geocode and scratch population.
    GeocodeRoads,
    /// Road alt-names population.
    AltNamesRoads,
    /// Address point alt-names population.
    AltNamesAddressPoints,
}

/// Why a source segment was not expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SkipReason {
    /// Excluded classification, no addressable side, no name, or a
    /// roundabout.
    NotGeocodable,
    /// Neither address system is in the configured restriction.
    AddressSystemExcluded,
}

/// A structured run event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A phase opened its edit session.
    PhaseStarted {
        /// The phase.
        phase: Phase,
    },
    /// A phase committed.
    PhaseCommitted {
        /// The phase.
        phase: Phase,
        /// Rows written in the phase.
        written: u64,
    },
    /// A phase was rolled back; nothing it wrote was kept.
    PhaseRolledBack {
        /// The phase.
        phase: Phase,
        /// The error that ended it.
        reason: String,
    },
    /// A source segment was not expanded.
    SegmentSkipped {
        /// Source object id.
        object_id: i64,
        /// Why.
        reason: SkipReason,
    },
    /// A single record failed and was skipped.
    RecordFailed {
        /// The phase.
        phase: Phase,
        /// Record identity (object id, global id, or join id).
        record: String,
        /// The error, with the record's values where available.
        message: String,
    },
    /// A scratch record has no cross-quadrant duplicate and was written to
    /// the alt-names table.
    CandidateKept {
        /// Scratch object id.
        object_id: i64,
        /// Global id of the source segment.
        global_id: String,
    },
    /// A scratch record duplicates another quadrant and was not written.
    CandidateSuppressed {
        /// Scratch object id.
        object_id: i64,
        /// Scratch object id of the covering record.
        matched_object_id: i64,
        /// Which test matched.
        reason: MatchReason,
    },
    /// An address point was written to the alt-names table.
    AddressPointWritten {
        /// Normalized join id.
        join_id: String,
    },
}

/// Receives run events.
pub trait EventSink {
    /// Handles one event.
    fn emit(&mut self, event: RunEvent);
}

/// Renders events through `log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: RunEvent) {
        match event {
            RunEvent::PhaseStarted { phase } => log::info!("Starting {phase}"),
            RunEvent::PhaseCommitted { phase, written } => {
                log::info!("Committed {phase}: {written} rows written");
            }
            RunEvent::PhaseRolledBack { phase, reason } => {
                log::error!("Rolled back {phase}: {reason}");
            }
            RunEvent::SegmentSkipped { object_id, reason } => {
                log::debug!("Skipped segment {object_id}: {reason}");
            }
            RunEvent::RecordFailed {
                phase,
                record,
                message,
            } => log::warn!("{phase}: record {record} failed: {message}"),
            RunEvent::CandidateKept {
                object_id,
                global_id,
            } => log::debug!("Kept scratch record {object_id} ({global_id})"),
            RunEvent::CandidateSuppressed {
                object_id,
                matched_object_id,
                reason,
            } => log::debug!(
                "Suppressed scratch record {object_id}: {reason} scratch record {matched_object_id}"
            ),
            RunEvent::AddressPointWritten { join_id } => {
                log::trace!("Wrote address point {join_id}");
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// Events in emission order.
    pub events: Vec<RunEvent>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&RunEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(*e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: RunEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.emit(RunEvent::PhaseStarted {
            phase: Phase::GeocodeRoads,
        });
        sink.emit(RunEvent::PhaseCommitted {
            phase: Phase::GeocodeRoads,
            written: 3,
        });

        assert_eq!(sink.events.len(), 2);
        assert_eq!(
            sink.count(|e| matches!(e, RunEvent::PhaseCommitted { written: 3, .. })),
            1
        );
    }

    #[test]
    fn phases_render_in_kebab_case() {
        assert_eq!(Phase::AltNamesAddressPoints.to_string(), "alt-names-address-points");
        assert_eq!(SkipReason::NotGeocodable.as_ref(), "not-geocodable");
        assert_eq!(MatchReason::SmallerFitsWithin.to_string(), "smaller-fits-within");
    }
}
