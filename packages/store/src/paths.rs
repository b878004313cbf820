#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! All paths are relative to the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/source/` directory holding the input databases.
#[must_use]
pub fn source_dir() -> PathBuf {
    data_dir().join("source")
}

/// Returns the `data/output/` directory holding the output workspace.
#[must_use]
pub fn output_dir() -> PathBuf {
    data_dir().join("output")
}

/// Returns the default path of the source roads `DuckDB` file.
#[must_use]
pub fn roads_db_path() -> PathBuf {
    source_dir().join("roads.duckdb")
}

/// Returns the default path of the address points `DuckDB` file.
#[must_use]
pub fn address_points_db_path() -> PathBuf {
    source_dir().join("address_points.duckdb")
}

/// Returns the default path of the output workspace `DuckDB` file.
#[must_use]
pub fn output_db_path() -> PathBuf {
    output_dir().join("geocode.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_under_data() {
        let data = data_dir();
        assert!(roads_db_path().starts_with(&data));
        assert!(address_points_db_path().starts_with(&data));
        assert!(output_db_path().ends_with("output/geocode.duckdb"));
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let dir = std::env::temp_dir()
            .join("altnames_paths_test")
            .join("nested");
        let _ = std::fs::remove_dir_all(&dir);

        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        ensure_dir(&dir).unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
