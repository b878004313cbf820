#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Field resolution and typed record decoding.
//!
//! Source feature collections expose their attributes positionally. This
//! crate resolves logical field names to positions once per run
//! ([`resolve`]), snapshots record values by name for diagnostics
//! ([`extract`]), and decodes rows into typed
//! [`altnames_roads_models::RoadSegment`] values for whichever roads schema
//! variant the source uses ([`roads::RoadFieldIndex`]).

pub mod extract;
pub mod resolve;
pub mod roads;

pub use extract::{ValueSnapshot, extract};
pub use resolve::{FieldIndexMap, ResolvedFields, resolve};
pub use roads::{RoadFieldIndex, RoadsSchemaVersion};

/// Errors from schema resolution and record decoding.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// One or more requested fields are absent from the schema.
    #[error("Fields not found in schema: {}", fields.join(", "))]
    MissingFields {
        /// Names that resolved neither by name nor by alias.
        fields: Vec<String>,
    },

    /// A row does not have a value at a resolved position.
    #[error("Record {object_id} has no value for field {field} (index {index})")]
    MissingValue {
        /// Record identity.
        object_id: i64,
        /// Logical field name.
        field: String,
        /// Resolved position.
        index: usize,
    },

    /// A numeric field holds a value that is not a number.
    #[error("Record {object_id} has a non-numeric {field}: {value}")]
    InvalidNumber {
        /// Record identity.
        object_id: i64,
        /// Logical field name.
        field: String,
        /// Offending value, rendered as text.
        value: String,
    },
}

/// A single field of a source schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Optional alias name.
    pub alias: Option<String>,
}

impl Field {
    /// Creates a field without an alias.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Creates a field with an alias.
    #[must_use]
    pub fn with_alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }
}

/// An ordered field list describing a source record layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Creates a schema from fields in positional order.
    #[must_use]
    pub const fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Creates an alias-less schema from field names.
    #[must_use]
    pub fn from_names(names: &[&str]) -> Self {
        Self::new(names.iter().map(|n| Field::new(*n)).collect())
    }

    /// The fields in positional order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field named exactly `name`.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Position of the field whose alias is exactly `alias`.
    #[must_use]
    pub fn find_field_by_alias(&self, alias: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.alias.as_deref() == Some(alias))
    }
}
