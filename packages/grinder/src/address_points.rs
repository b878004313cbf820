//! Address point alt-names table building.
//!
//! The source already returns only points that exist under a single prefix
//! direction. What is left here is normalizing the join identifier and
//! writing the rows in one edit session.

use std::sync::LazyLock;

use altnames_roads_models::AltNameAddressPoint;
use altnames_store::{AddressPointSource, OutputWorkspace};
use regex::Regex;

use crate::events::{EventSink, Phase, RunEvent};
use crate::progress::ProgressCallback;
use crate::{GrindError, in_edit_session};

/// Matches runs of whitespace.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapses whitespace runs to a single space and trims both ends.
///
/// Join identifiers are built by concatenation, so an empty number suffix
/// leaves a double space: `"X | 100  E CENTER ST"` becomes
/// `"X | 100 E CENTER ST"`.
#[must_use]
pub fn normalize_join_id(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// Counters for one [`grind_address_points`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressPointsSummary {
    /// Points returned by the source.
    pub candidates: u64,
    /// Rows written.
    pub written: u64,
    /// Rows the store refused.
    pub failed: u64,
}

/// Builds the address point alt-names table from `source`.
///
/// The candidates are fetched before the output is touched, so a failing
/// source query leaves the previous table in place. Refused rows are
/// skipped; the rest are committed together.
///
/// # Errors
///
/// Returns [`GrindError::Store`] if the source query fails, or if the
/// session cannot begin or commit.
pub fn grind_address_points<S, W>(
    source: &S,
    workspace: &mut W,
    sink: &mut dyn EventSink,
    progress: &dyn ProgressCallback,
) -> Result<AddressPointsSummary, GrindError>
where
    S: AddressPointSource,
    W: OutputWorkspace,
{
    let candidates = source.altname_candidates()?;
    log::info!("{} address points need an alt-name row", candidates.len());

    workspace.prepare_address_point_output()?;

    let mut summary = AddressPointsSummary {
        candidates: candidates.len() as u64,
        ..AddressPointsSummary::default()
    };

    progress.set_total(summary.candidates);
    progress.set_position(0);
    progress.set_message("Writing address point alt-names".to_string());

    in_edit_session(
        workspace,
        Phase::AltNamesAddressPoints,
        sink,
        |session, sink| {
            for candidate in candidates {
                progress.inc(1);
                let join_id = normalize_join_id(&candidate.join_id);
                let row = AltNameAddressPoint::from_record(&candidate.record, join_id);

                match session.insert_alt_name_address_point(&row) {
                    Ok(()) => {
                        summary.written += 1;
                        sink.emit(RunEvent::AddressPointWritten {
                            join_id: row.join_id,
                        });
                    }
                    Err(e) => {
                        summary.failed += 1;
                        sink.emit(RunEvent::RecordFailed {
                            phase: Phase::AltNamesAddressPoints,
                            record: row.join_id,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Ok(summary.written)
        },
    )?;

    progress.finish_and_clear();

    log::info!(
        "Address points: {} candidates, {} written, {} failed",
        summary.candidates,
        summary.written,
        summary.failed
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use altnames_roads_models::AddressPointRecord;
    use altnames_store::{InMemoryAddressPointSource, InMemoryWorkspace};

    use super::*;
    use crate::events::RecordingSink;
    use crate::progress::NullProgress;

    fn point(prefix: &str, name: &str, number: &str) -> AddressPointRecord {
        AddressPointRecord {
            system: "SALT LAKE CITY".to_string(),
            number: number.to_string(),
            prefix_dir: prefix.to_string(),
            street_name: name.to_string(),
            street_type: "ST".to_string(),
            city: "SALT LAKE CITY".to_string(),
            zip: "84101".to_string(),
            ..AddressPointRecord::default()
        }
    }

    #[test]
    fn normalizes_whitespace_runs() {
        assert_eq!(normalize_join_id("A  |  100   MAIN ST"), "A | 100 MAIN ST");
        assert_eq!(normalize_join_id("  X | 100  E CENTER ST "), "X | 100 E CENTER ST");
        assert_eq!(normalize_join_id("X\t|\n1"), "X | 1");
        assert_eq!(normalize_join_id(""), "");
    }

    #[test]
    fn writes_only_points_without_a_twin() {
        let source = InMemoryAddressPointSource::new(vec![
            point("N", "STATE", "100"),
            point("S", "STATE", "100"),
            point("E", "CENTER", "200"),
            point("W", "HIGHWAY 89", "300"),
            point("", "MAIN", "400"),
        ]);
        let mut ws = InMemoryWorkspace::new();
        let mut sink = RecordingSink::new();

        let summary = grind_address_points(&source, &mut ws, &mut sink, &NullProgress).unwrap();

        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.written, 1);
        let rows = ws.alt_name_address_points();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].street_name, "CENTER");
        assert_eq!(rows[0].join_id, "SALT LAKE CITY | 200 E CENTER ST");
        assert_eq!(
            sink.count(|e| matches!(e, RunEvent::AddressPointWritten { .. })),
            1
        );
    }

    #[test]
    fn refused_rows_are_skipped_and_the_rest_committed() {
        let source = InMemoryAddressPointSource::new(vec![
            point("E", "CENTER", "200"),
            point("E", "CENTER", "300"),
        ]);
        let mut ws = InMemoryWorkspace::new();
        ws.reject_record("SALT LAKE CITY | 200 E CENTER ST");
        let mut sink = RecordingSink::new();

        let summary = grind_address_points(&source, &mut ws, &mut sink, &NullProgress).unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(ws.alt_name_address_points()[0].number, "300");
        assert_eq!(
            sink.count(|e| matches!(e, RunEvent::PhaseCommitted { written: 1, .. })),
            1
        );
    }

    #[test]
    fn failed_commit_leaves_no_rows() {
        let source = InMemoryAddressPointSource::new(vec![point("E", "CENTER", "200")]);
        let mut ws = InMemoryWorkspace::new();
        ws.fail_next_commit();
        let mut sink = RecordingSink::new();

        let result = grind_address_points(&source, &mut ws, &mut sink, &NullProgress);

        assert!(matches!(result, Err(GrindError::Store(_))));
        assert!(ws.alt_name_address_points().is_empty());
        assert_eq!(
            sink.count(|e| matches!(e, RunEvent::PhaseRolledBack { .. })),
            1
        );
    }
}
