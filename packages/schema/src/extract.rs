//! Name-keyed value snapshots of source records.

use std::collections::BTreeMap;
use std::fmt;

use altnames_roads_models::{FieldValue, SourceRow};

use crate::ResolvedFields;

/// A snapshot of a record's values keyed by logical field name, with the
/// position each value was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSnapshot {
    values: BTreeMap<String, (usize, FieldValue)>,
}

impl ValueSnapshot {
    /// Value read for `name`, if it was requested.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name).map(|(_, v)| v)
    }

    /// Position `name` was read from, if it was requested.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<usize> {
        self.values.get(name).map(|(i, _)| *i)
    }

    /// Number of values in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the snapshot holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for ValueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, (_, value)) in &self.values {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match value {
                FieldValue::Blob(bytes) => write!(f, "{name}=<{} bytes>", bytes.len())?,
                FieldValue::Null => write!(f, "{name}=NULL")?,
                other => write!(f, "{name}={:?}", other.as_text())?,
            }
        }
        Ok(())
    }
}

/// Reads the values at the positions in `fields` from `row`.
///
/// Positions past the end of the row read as [`FieldValue::Null`].
#[must_use]
pub fn extract(row: &SourceRow, fields: &ResolvedFields) -> ValueSnapshot {
    let values = fields
        .iter()
        .map(|(name, index)| {
            let value = row.values.get(index).cloned().unwrap_or(FieldValue::Null);
            (name.to_string(), (index, value))
        })
        .collect();

    ValueSnapshot { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Schema, resolve};

    #[test]
    fn extracts_values_by_name() {
        let schema = Schema::from_names(&["OBJECTID", "NAME", "L_F_ADD"]);
        let fields = resolve(&schema, &["NAME", "L_F_ADD"])
            .into_resolved()
            .unwrap();
        let row = SourceRow {
            object_id: 7,
            values: vec![
                FieldValue::Integer(7),
                FieldValue::Text("MAIN".to_string()),
                FieldValue::Double(101.0),
            ],
        };

        let snapshot = extract(&row, &fields);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.value("NAME"),
            Some(&FieldValue::Text("MAIN".to_string()))
        );
        assert_eq!(snapshot.index("L_F_ADD"), Some(2));
        assert_eq!(snapshot.value("OBJECTID"), None);
    }

    #[test]
    fn display_renders_every_value() {
        let schema = Schema::from_names(&["NAME", "SHAPE"]);
        let fields = resolve(&schema, &["NAME", "SHAPE"])
            .into_resolved()
            .unwrap();
        let row = SourceRow {
            object_id: 1,
            values: vec![FieldValue::Null, FieldValue::Blob(vec![1, 2, 3])],
        };

        assert_eq!(extract(&row, &fields).to_string(), "NAME=NULL, SHAPE=<3 bytes>");
    }
}
