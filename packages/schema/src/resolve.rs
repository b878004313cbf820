//! Resolves logical field names to positions within a schema.

use std::collections::BTreeMap;

use crate::{Schema, SchemaError};

/// Result of resolving a list of names: each name maps to its position, or
/// `None` if it was found neither by name nor by alias.
///
/// Use [`FieldIndexMap::into_resolved`] before extracting values; a
/// partially resolved map must abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndexMap {
    entries: Vec<(String, Option<usize>)>,
}

impl FieldIndexMap {
    /// Position of `name`, if it was requested and resolved.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, i)| *i)
    }

    /// Names that could not be resolved, in request order.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, i)| i.is_none())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Converts into a fully resolved map.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingFields`] listing every unresolved
    /// name.
    pub fn into_resolved(self) -> Result<ResolvedFields, SchemaError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(SchemaError::MissingFields { fields: missing });
        }

        let indices = self
            .entries
            .into_iter()
            .filter_map(|(n, i)| i.map(|i| (n, i)))
            .collect();

        Ok(ResolvedFields { indices })
    }
}

/// A name-to-position map in which every requested name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    indices: BTreeMap<String, usize>,
}

impl ResolvedFields {
    /// Position of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Iterates `(name, position)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.indices.iter().map(|(n, i)| (n.as_str(), *i))
    }

    /// Number of resolved fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if no fields were requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Resolves each of `names` to its position in `schema`.
///
/// Each name is trimmed and looked up by exact field name first, then by
/// alias. Unresolvable names are kept with a `None` position.
#[must_use]
pub fn resolve(schema: &Schema, names: &[&str]) -> FieldIndexMap {
    let entries = names
        .iter()
        .map(|name| {
            let trimmed = name.trim();
            let index = schema
                .find_field(trimmed)
                .or_else(|| schema.find_field_by_alias(trimmed));
            if index.is_none() {
                log::debug!("Field {trimmed} not found by name or alias");
            }
            ((*name).to_string(), index)
        })
        .collect();

    FieldIndexMap { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("OBJECTID"),
            Field::new("NAME"),
            Field::with_alias("STREETTYPE", "POSTTYPE"),
            Field::new("POSTTYPE_OLD"),
        ])
    }

    #[test]
    fn resolves_by_name() {
        let map = resolve(&schema(), &["NAME"]);
        assert_eq!(map.get("NAME"), Some(1));
    }

    #[test]
    fn falls_back_to_alias() {
        let map = resolve(&schema(), &["POSTTYPE"]);
        assert_eq!(map.get("POSTTYPE"), Some(2));
    }

    #[test]
    fn name_wins_over_alias() {
        let schema = Schema::new(vec![
            Field::with_alias("A", "B"),
            Field::new("B"),
        ]);
        let map = resolve(&schema, &["B"]);
        assert_eq!(map.get("B"), Some(1));
    }

    #[test]
    fn trims_requested_names() {
        let map = resolve(&schema(), &[" NAME "]);
        assert_eq!(map.get(" NAME "), Some(1));
    }

    #[test]
    fn unresolved_names_fail_conversion() {
        let map = resolve(&schema(), &["NAME", "PREDIR", "SUFDIR"]);
        assert_eq!(map.missing(), vec!["PREDIR".to_string(), "SUFDIR".to_string()]);

        let err = map.into_resolved().unwrap_err();
        match err {
            SchemaError::MissingFields { fields } => {
                assert_eq!(fields, vec!["PREDIR".to_string(), "SUFDIR".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fully_resolved_map_converts() {
        let resolved = resolve(&schema(), &["OBJECTID", "NAME"])
            .into_resolved()
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get("OBJECTID"), Some(0));
    }
}
