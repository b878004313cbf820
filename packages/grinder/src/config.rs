//! Run configuration loaded from TOML.
//!
//! Every key is optional. A missing file section takes its defaults, so an
//! empty file is a valid configuration:
//!
//! ```toml
//! [source]
//! path = "data/source/roads.duckdb"
//! roads_table = "roads"
//! geometry_field = "SHAPE"
//! address_systems = []
//!
//! [output]
//! path = "data/output/geocode.duckdb"
//!
//! [address_points]
//! path = "data/source/address_points.duckdb"
//! table = "address_points"
//!
//! [matching]
//! mirror_primary_names = false
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use altnames_schema::roads::DEFAULT_GEOMETRY_FIELD;
use altnames_store::paths;
use serde::Deserialize;

use crate::roads::RoadsOptions;

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`GrindConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrindConfig {
    /// Source roads.
    pub source: SourceConfig,
    /// Output workspace.
    pub output: OutputConfig,
    /// Source address points.
    pub address_points: AddressPointsConfig,
    /// Matching behavior.
    pub matching: MatchingConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Roads database file.
    #[serde(default = "paths::roads_db_path")]
    pub path: PathBuf,
    /// Roads table within the database.
    #[serde(default = "default_roads_table")]
    pub roads_table: String,
    /// Name of the geometry field.
    #[serde(default = "default_geometry_field")]
    pub geometry_field: String,
    /// Only segments with one of these address systems on either side are
    /// processed. Empty means all.
    #[serde(default)]
    pub address_systems: Vec<String>,
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output workspace database file.
    #[serde(default = "paths::output_db_path")]
    pub path: PathBuf,
}

/// `[address_points]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressPointsConfig {
    /// Address points database file.
    #[serde(default = "paths::address_points_db_path")]
    pub path: PathBuf,
    /// Address points table within the database.
    #[serde(default = "default_address_points_table")]
    pub table: String,
}

/// `[matching]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    /// Also copy primary-name records into the scratch store, so alias
    /// names are matched against primary names in other quadrants.
    pub mirror_primary_names: bool,
}

fn default_roads_table() -> String {
    "roads".to_string()
}

fn default_geometry_field() -> String {
    DEFAULT_GEOMETRY_FIELD.to_string()
}

fn default_address_points_table() -> String {
    "address_points".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: paths::roads_db_path(),
            roads_table: default_roads_table(),
            geometry_field: default_geometry_field(),
            address_systems: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: paths::output_db_path(),
        }
    }
}

impl Default for AddressPointsConfig {
    fn default() -> Self {
        Self {
            path: paths::address_points_db_path(),
            table: default_address_points_table(),
        }
    }
}

impl GrindConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid
    /// configuration.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Options for the road alt-names builder.
    #[must_use]
    pub fn roads_options(&self) -> RoadsOptions {
        RoadsOptions {
            geometry_field: self.source.geometry_field.clone(),
            address_systems: self
                .source
                .address_systems
                .iter()
                .map(|s| s.trim().to_string())
                .collect::<BTreeSet<_>>(),
            mirror_primary_names: self.matching.mirror_primary_names,
        }
    }
}
