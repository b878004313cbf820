//! In-memory implementations of the storage traits.
//!
//! Used as test doubles. [`InMemoryWorkspace`] snapshots its tables when an
//! edit begins and restores the snapshot on rollback, and can be told to
//! reject specific records or fail the next commit.

use std::collections::BTreeSet;

use altnames_roads_models::{
    AddressPointCandidate, AddressPointRecord, AltNameAddressPoint, AltNameRoad, Envelope,
    GeocodeRoad, MatchKey, RoadAttributes, SourceRow, StoredRoad,
};
use altnames_schema::{Schema, resolve};

use crate::{
    ALT_NAMES_ADDRESS_POINTS_TABLE, ALT_NAMES_ROADS_TABLE, AddressPointSource, GEOCODE_ROADS_TABLE,
    OutputWorkspace, RoadSource, SCRATCH_INDEX_FIELDS, SCRATCH_ROADS_TABLE, StoreError,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    geocode: Vec<GeocodeRoad>,
    scratch: Vec<StoredRoad>,
    alt_name_roads: Vec<AltNameRoad>,
    alt_name_address_points: Vec<AltNameAddressPoint>,
    next_geocode_id: i64,
    next_scratch_id: i64,
}

/// An [`OutputWorkspace`] held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryWorkspace {
    tables: Tables,
    snapshot: Option<Tables>,
    roads_prepared: bool,
    address_points_prepared: bool,
    rejected_keys: BTreeSet<String>,
    commits_before_failure: Option<usize>,
    scratch_indexes: Vec<String>,
    archived: Vec<String>,
}

impl InMemoryWorkspace {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every insert whose global id or join id equals `key`.
    pub fn reject_record(&mut self, key: impl Into<String>) {
        self.rejected_keys.insert(key.into());
    }

    /// Makes the next commit fail and discard the open edit.
    pub const fn fail_next_commit(&mut self) {
        self.fail_commit_after(0);
    }

    /// Lets `successes` commits through, then fails the one after.
    pub const fn fail_commit_after(&mut self, successes: usize) {
        self.commits_before_failure = Some(successes);
    }

    /// Geocode records, in insertion order.
    #[must_use]
    pub fn geocode_roads(&self) -> &[GeocodeRoad] {
        &self.tables.geocode
    }

    /// Scratch records, in insertion order.
    #[must_use]
    pub fn scratch_roads(&self) -> &[StoredRoad] {
        &self.tables.scratch
    }

    /// Road alt-names rows, in insertion order.
    #[must_use]
    pub fn alt_name_roads(&self) -> &[AltNameRoad] {
        &self.tables.alt_name_roads
    }

    /// Address point alt-names rows, in insertion order.
    #[must_use]
    pub fn alt_name_address_points(&self) -> &[AltNameAddressPoint] {
        &self.tables.alt_name_address_points
    }

    /// Names of the indexes created on the scratch table.
    #[must_use]
    pub fn scratch_indexes(&self) -> &[String] {
        &self.scratch_indexes
    }

    /// Tables that were archived by a repeated `prepare_*` call.
    #[must_use]
    pub fn archived_tables(&self) -> &[String] {
        &self.archived
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.rejected_keys.contains(key) {
            return Err(StoreError::Rejected {
                message: format!("record {key} refused by store"),
            });
        }
        Ok(())
    }

    fn scratch(&self, object_id: i64) -> Option<&StoredRoad> {
        self.tables
            .scratch
            .iter()
            .find(|r| r.object_id == object_id)
    }
}

impl OutputWorkspace for InMemoryWorkspace {
    fn begin_edit(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::EditInProgress);
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit_edit(&mut self) -> Result<(), StoreError> {
        let snapshot = self.snapshot.take().ok_or(StoreError::NoEditInProgress)?;
        match self.commits_before_failure {
            Some(0) => {
                self.commits_before_failure = None;
                self.tables = snapshot;
                Err(StoreError::Rejected {
                    message: "commit failed".to_string(),
                })
            }
            Some(n) => {
                self.commits_before_failure = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn rollback_edit(&mut self) -> Result<(), StoreError> {
        let snapshot = self.snapshot.take().ok_or(StoreError::NoEditInProgress)?;
        self.tables = snapshot;
        Ok(())
    }

    fn is_editing(&self) -> bool {
        self.snapshot.is_some()
    }

    fn prepare_road_outputs(&mut self) -> Result<(), StoreError> {
        if self.roads_prepared {
            for table in [GEOCODE_ROADS_TABLE, ALT_NAMES_ROADS_TABLE] {
                self.archived.push(table.to_string());
            }
        }
        self.roads_prepared = true;
        self.tables.geocode.clear();
        self.tables.scratch.clear();
        self.tables.alt_name_roads.clear();
        self.tables.next_geocode_id = 0;
        self.tables.next_scratch_id = 0;
        self.scratch_indexes.clear();
        Ok(())
    }

    fn prepare_address_point_output(&mut self) -> Result<(), StoreError> {
        if self.address_points_prepared {
            self.archived.push(ALT_NAMES_ADDRESS_POINTS_TABLE.to_string());
        }
        self.address_points_prepared = true;
        self.tables.alt_name_address_points.clear();
        Ok(())
    }

    fn insert_geocode_road(&mut self, road: &GeocodeRoad) -> Result<i64, StoreError> {
        self.check(&road.attributes.global_id)?;
        self.tables.next_geocode_id += 1;
        self.tables.geocode.push(road.clone());
        Ok(self.tables.next_geocode_id)
    }

    fn insert_scratch_road(&mut self, attributes: &RoadAttributes) -> Result<i64, StoreError> {
        self.check(&attributes.global_id)?;
        self.tables.next_scratch_id += 1;
        let object_id = self.tables.next_scratch_id;
        self.tables.scratch.push(StoredRoad {
            object_id,
            attributes: attributes.clone(),
        });
        Ok(object_id)
    }

    fn insert_alt_name_road(&mut self, row: &AltNameRoad) -> Result<(), StoreError> {
        self.check(&row.global_id)?;
        self.tables.alt_name_roads.push(row.clone());
        Ok(())
    }

    fn insert_alt_name_address_point(
        &mut self,
        row: &AltNameAddressPoint,
    ) -> Result<(), StoreError> {
        self.check(&row.join_id)?;
        self.tables.alt_name_address_points.push(row.clone());
        Ok(())
    }

    fn create_scratch_indexes(&mut self) -> Result<(), StoreError> {
        self.scratch_indexes = SCRATCH_INDEX_FIELDS
            .iter()
            .map(|field| format!("{SCRATCH_ROADS_TABLE}_{field}_idx"))
            .collect();
        Ok(())
    }

    fn scratch_needing_disambiguation(&self) -> Result<Vec<StoredRoad>, StoreError> {
        Ok(self
            .tables
            .scratch
            .iter()
            .filter(|r| r.attributes.needs_disambiguation())
            .cloned()
            .collect())
    }

    fn possible_candidates(&self, key: &MatchKey) -> Result<Vec<StoredRoad>, StoreError> {
        Ok(self
            .tables
            .scratch
            .iter()
            .filter(|r| key.matches(&r.attributes))
            .cloned()
            .collect())
    }

    fn range_contains(&self, object_id: i64, envelope: Envelope) -> Result<bool, StoreError> {
        Ok(self
            .scratch(object_id)
            .is_some_and(|r| r.attributes.range.contains_either(envelope)))
    }
}

/// A [`RoadSource`] over rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoadSource {
    schema: Schema,
    rows: Vec<SourceRow>,
}

impl InMemoryRoadSource {
    /// Creates a source with the given schema and rows.
    #[must_use]
    pub const fn new(schema: Schema, rows: Vec<SourceRow>) -> Self {
        Self { schema, rows }
    }
}

impl RoadSource for InMemoryRoadSource {
    fn schema(&self) -> Result<Schema, StoreError> {
        Ok(self.schema.clone())
    }

    fn row_count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.len() as u64)
    }

    fn for_each_row<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<StoreError>,
        F: FnMut(SourceRow) -> Result<(), E>,
    {
        for row in &self.rows {
            f(row.clone())?;
        }
        Ok(())
    }

    fn null_value_count(&self, fields: &[&str]) -> Result<u64, StoreError> {
        let map = resolve(&self.schema, fields);
        let indices: Vec<usize> = fields.iter().filter_map(|f| map.get(f)).collect();

        Ok(self
            .rows
            .iter()
            .filter(|row| {
                indices
                    .iter()
                    .any(|i| row.values.get(*i).is_none_or(altnames_roads_models::FieldValue::is_null))
            })
            .count() as u64)
    }
}

/// An [`AddressPointSource`] that evaluates the anti-join over points held
/// in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAddressPointSource {
    points: Vec<AddressPointRecord>,
}

impl InMemoryAddressPointSource {
    /// Creates a source over `points`.
    #[must_use]
    pub const fn new(points: Vec<AddressPointRecord>) -> Self {
        Self { points }
    }
}

impl AddressPointSource for InMemoryAddressPointSource {
    fn altname_candidates(&self) -> Result<Vec<AddressPointCandidate>, StoreError> {
        let candidates: BTreeSet<AddressPointCandidate> = self
            .points
            .iter()
            .filter(|p| p.is_alt_name_eligible())
            .filter(|p| {
                !self
                    .points
                    .iter()
                    .any(|other| p.same_location_different_prefix(other))
            })
            .map(|p| AddressPointCandidate {
                record: p.clone(),
                join_id: p.raw_join_id(),
            })
            .collect();

        Ok(candidates.into_iter().collect())
    }
}
