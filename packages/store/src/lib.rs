#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Storage for the alternate-names pipeline.
//!
//! Everything the grinder reads from or writes to lives behind three
//! traits:
//!
//! - [`OutputWorkspace`]: the output geocode, scratch, and alt-names tables,
//!   with one edit transaction at a time, scoped by [`EditSession`]
//! - [`RoadSource`]: forward-only visitation of source road rows
//! - [`AddressPointSource`]: the address point anti-join query
//!
//! Each has a `DuckDB` implementation and an in-memory implementation used
//! by tests.

pub mod address_points;
pub mod duckdb_workspace;
pub mod memory;
pub mod paths;
pub mod road_source;
pub mod session;

mod sql;

use altnames_roads_models::{
    AltNameAddressPoint, AltNameRoad, Envelope, GeocodeRoad, MatchKey, RoadAttributes, StoredRoad,
};

pub use address_points::{AddressPointSource, DuckDbAddressPointSource};
pub use duckdb_workspace::DuckDbWorkspace;
pub use memory::{InMemoryAddressPointSource, InMemoryRoadSource, InMemoryWorkspace};
pub use road_source::{DuckDbRoadSource, RoadSource};
pub use session::EditSession;

/// Geocode-ready road feature table.
pub const GEOCODE_ROADS_TABLE: &str = "GeocodeRoads";

/// Indexed copy of alias records used only for matching.
pub const SCRATCH_ROADS_TABLE: &str = "GeocodeRoadsScratch";

/// Road alt-names table.
pub const ALT_NAMES_ROADS_TABLE: &str = "AltNamesRoads";

/// Address point alt-names table.
pub const ALT_NAMES_ADDRESS_POINTS_TABLE: &str = "AltNamesAddrPnts";

/// The ten lookup fields indexed on the scratch table.
pub const SCRATCH_INDEX_FIELDS: &[&str] = &[
    "ADDRSYS_L",
    "ADDRSYS_R",
    "FROMADDR_L",
    "TOADDR_L",
    "FROMADDR_R",
    "TOADDR_R",
    "PREDIR",
    "NAME",
    "POSTTYPE",
    "POSTDIR",
];

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A second edit was started while one is open.
    #[error("An edit session is already open on this workspace")]
    EditInProgress,

    /// Commit or rollback was called without an open edit.
    #[error("No edit session is open on this workspace")]
    NoEditInProgress,

    /// A source table does not exist.
    #[error("Table not found: {table}")]
    TableNotFound {
        /// Table name.
        table: String,
    },

    /// The store refused a single record.
    #[error("Record rejected: {message}")]
    Rejected {
        /// Description of what went wrong.
        message: String,
    },
}

/// The output side of the pipeline.
///
/// Implementations allow at most one open edit at a time: `begin_edit`
/// fails with [`StoreError::EditInProgress`] until the open edit is
/// committed or rolled back. Prefer [`EditSession`] over calling the edit
/// methods directly.
pub trait OutputWorkspace {
    /// Opens an edit transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EditInProgress`] if an edit is already open.
    fn begin_edit(&mut self) -> Result<(), StoreError>;

    /// Commits the open edit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if there is no open edit or the commit fails.
    /// The edit is closed either way.
    fn commit_edit(&mut self) -> Result<(), StoreError>;

    /// Discards the open edit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if there is no open edit or the rollback
    /// fails.
    fn rollback_edit(&mut self) -> Result<(), StoreError>;

    /// Returns `true` while an edit is open.
    fn is_editing(&self) -> bool;

    /// Archives existing road outputs and creates empty geocode, scratch,
    /// and road alt-names tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a table cannot be renamed or created.
    fn prepare_road_outputs(&mut self) -> Result<(), StoreError>;

    /// Archives an existing address point alt-names table and creates an
    /// empty one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table cannot be renamed or created.
    fn prepare_address_point_output(&mut self) -> Result<(), StoreError>;

    /// Writes a geocode record and returns its object id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record cannot be written.
    fn insert_geocode_road(&mut self, road: &GeocodeRoad) -> Result<i64, StoreError>;

    /// Writes a scratch record and returns its object id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record cannot be written.
    fn insert_scratch_road(&mut self, attributes: &RoadAttributes) -> Result<i64, StoreError>;

    /// Writes a road alt-names row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the row cannot be written.
    fn insert_alt_name_road(&mut self, row: &AltNameRoad) -> Result<(), StoreError>;

    /// Writes an address point alt-names row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the row cannot be written.
    fn insert_alt_name_address_point(
        &mut self,
        row: &AltNameAddressPoint,
    ) -> Result<(), StoreError>;

    /// Indexes [`SCRATCH_INDEX_FIELDS`] on the scratch table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if an index cannot be created.
    fn create_scratch_indexes(&mut self) -> Result<(), StoreError>;

    /// Scratch records with a predirectional and an alphabetic name, in
    /// object id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn scratch_needing_disambiguation(&self) -> Result<Vec<StoredRoad>, StoreError>;

    /// Scratch records matching `key`, in store order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn possible_candidates(&self, key: &MatchKey) -> Result<Vec<StoredRoad>, StoreError>;

    /// Returns `true` if the stored range of scratch record `object_id`
    /// contains either endpoint of `envelope` on either side.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn range_contains(&self, object_id: i64, envelope: Envelope) -> Result<bool, StoreError>;
}
