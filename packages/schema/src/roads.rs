//! Roads schema variants and typed segment decoding.

use altnames_roads_models::{AddressRange, FieldValue, Geometry, RoadSegment, SourceRow};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{ResolvedFields, Schema, SchemaError, resolve};

/// Default name of the geometry field.
pub const DEFAULT_GEOMETRY_FIELD: &str = "SHAPE";

/// Logical field names for one roads schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadFieldNames {
    pub address_system_left: &'static str,
    pub address_system_right: &'static str,
    pub from_left: &'static str,
    pub to_left: &'static str,
    pub from_right: &'static str,
    pub to_right: &'static str,
    pub predir: &'static str,
    pub name: &'static str,
    pub street_type: &'static str,
    pub postdir: &'static str,
    pub alias1_name: &'static str,
    pub alias1_type: &'static str,
    pub alias2_name: &'static str,
    pub alias2_type: &'static str,
    pub acs_name: &'static str,
    pub acs_postdir: &'static str,
    pub zip_left: &'static str,
    pub zip_right: &'static str,
    pub global_id: &'static str,
    pub classification: &'static str,
}

const CURRENT: RoadFieldNames = RoadFieldNames {
    address_system_left: "ADDRSYS_L",
    address_system_right: "ADDRSYS_R",
    from_left: "FROMADDR_L",
    to_left: "TOADDR_L",
    from_right: "FROMADDR_R",
    to_right: "TOADDR_R",
    predir: "PREDIR",
    name: "NAME",
    street_type: "POSTTYPE",
    postdir: "POSTDIR",
    alias1_name: "A1_NAME",
    alias1_type: "A1_POSTTYPE",
    alias2_name: "A2_NAME",
    alias2_type: "A2_POSTTYPE",
    acs_name: "AN_NAME",
    acs_postdir: "AN_POSTDIR",
    zip_left: "ZIPCODE_L",
    zip_right: "ZIPCODE_R",
    global_id: "GLOBALID",
    classification: "CARTOCODE",
};

// The legacy schema carries a single address system for both sides.
const LEGACY: RoadFieldNames = RoadFieldNames {
    address_system_left: "ADDR_SYS",
    address_system_right: "ADDR_SYS",
    from_left: "L_F_ADD",
    to_left: "L_T_ADD",
    from_right: "R_F_ADD",
    to_right: "R_T_ADD",
    predir: "PREDIR",
    name: "STREETNAME",
    street_type: "STREETTYPE",
    postdir: "SUFDIR",
    alias1_name: "ALIAS1",
    alias1_type: "ALIAS1TYPE",
    alias2_name: "ALIAS2",
    alias2_type: "ALIAS2TYPE",
    acs_name: "ACSNAME",
    acs_postdir: "ACSSUF",
    zip_left: "ZIPLEFT",
    zip_right: "ZIPRIGHT",
    global_id: "GLOBALID",
    classification: "CARTOCODE",
};

/// The roads schema variants accepted as source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RoadsSchemaVersion {
    /// Split address systems and `*_L`/`*_R` range fields.
    Current,
    /// Single `ADDR_SYS` and `L_F_ADD`-style range fields.
    Legacy,
}

impl RoadsSchemaVersion {
    /// Detects the variant a schema follows.
    ///
    /// A schema is legacy when it has `ADDR_SYS` and `STREETNAME` and
    /// lacks `ADDRSYS_L`. Everything else is treated as current, so a
    /// malformed schema surfaces as missing current fields.
    #[must_use]
    pub fn detect(schema: &Schema) -> Self {
        let has = |name: &str| {
            schema.find_field(name).is_some() || schema.find_field_by_alias(name).is_some()
        };

        if has(LEGACY.address_system_left) && has(LEGACY.name) && !has(CURRENT.address_system_left)
        {
            Self::Legacy
        } else {
            Self::Current
        }
    }

    /// Field names for this variant.
    #[must_use]
    pub const fn names(self) -> &'static RoadFieldNames {
        match self {
            Self::Current => &CURRENT,
            Self::Legacy => &LEGACY,
        }
    }

    /// Attribute field names in declaration order, without duplicates.
    #[must_use]
    pub fn attribute_fields(self) -> Vec<&'static str> {
        let n = self.names();
        let mut fields = vec![
            n.address_system_left,
            n.address_system_right,
            n.from_left,
            n.to_left,
            n.from_right,
            n.to_right,
            n.predir,
            n.name,
            n.street_type,
            n.postdir,
            n.alias1_name,
            n.alias1_type,
            n.alias2_name,
            n.alias2_type,
            n.acs_name,
            n.acs_postdir,
            n.zip_left,
            n.zip_right,
            n.global_id,
            n.classification,
        ];
        fields.dedup();
        fields
    }

    /// Fields that must never be null in the source. A non-zero null count
    /// over these aborts the run before any output is written.
    #[must_use]
    pub fn required_fields(self) -> Vec<&'static str> {
        let n = self.names();
        let mut fields = vec![
            n.address_system_left,
            n.address_system_right,
            n.from_left,
            n.to_left,
            n.from_right,
            n.to_right,
        ];
        fields.dedup();
        fields
    }
}

/// Resolved positions for every roads field, built once per run.
#[derive(Debug, Clone)]
pub struct RoadFieldIndex {
    version: RoadsSchemaVersion,
    geometry_field: String,
    fields: ResolvedFields,
}

impl RoadFieldIndex {
    /// Detects the schema variant and resolves every field it needs.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingFields`] if any field of the detected
    /// variant, or the geometry field, is absent.
    pub fn build(schema: &Schema, geometry_field: &str) -> Result<Self, SchemaError> {
        let version = RoadsSchemaVersion::detect(schema);
        let mut names = version.attribute_fields();
        names.push(geometry_field);

        let fields = resolve(schema, &names).into_resolved()?;

        log::info!(
            "Resolved {} roads fields ({version} schema)",
            fields.len()
        );

        Ok(Self {
            version,
            geometry_field: geometry_field.to_string(),
            fields,
        })
    }

    /// The detected schema variant.
    #[must_use]
    pub const fn version(&self) -> RoadsSchemaVersion {
        self.version
    }

    /// All resolved fields, for diagnostic snapshots.
    #[must_use]
    pub const fn fields(&self) -> &ResolvedFields {
        &self.fields
    }

    /// Decodes a source row into a [`RoadSegment`].
    ///
    /// Text fields are trimmed. Null numbers read as `0`.
    ///
    /// # Errors
    ///
    /// * [`SchemaError::MissingValue`] if the row is shorter than the schema
    /// * [`SchemaError::InvalidNumber`] if a range field is not numeric
    pub fn decode(&self, row: &SourceRow) -> Result<RoadSegment, SchemaError> {
        let n = self.version.names();

        let geometry = match self.value(row, &self.geometry_field)? {
            FieldValue::Blob(bytes) => Geometry(bytes.clone()),
            _ => Geometry::default(),
        };

        Ok(RoadSegment {
            object_id: row.object_id,
            address_system_left: self.text(row, n.address_system_left)?,
            address_system_right: self.text(row, n.address_system_right)?,
            range: AddressRange::new(
                self.number(row, n.from_left)?,
                self.number(row, n.to_left)?,
                self.number(row, n.from_right)?,
                self.number(row, n.to_right)?,
            ),
            predir: self.text(row, n.predir)?,
            name: self.text(row, n.name)?,
            street_type: self.text(row, n.street_type)?,
            postdir: self.text(row, n.postdir)?,
            alias1_name: self.text(row, n.alias1_name)?,
            alias1_type: self.text(row, n.alias1_type)?,
            alias2_name: self.text(row, n.alias2_name)?,
            alias2_type: self.text(row, n.alias2_type)?,
            acs_name: self.text(row, n.acs_name)?,
            acs_postdir: self.text(row, n.acs_postdir)?,
            zip_left: self.text(row, n.zip_left)?,
            zip_right: self.text(row, n.zip_right)?,
            global_id: self.text(row, n.global_id)?,
            classification: self.text(row, n.classification)?,
            geometry,
        })
    }

    fn value<'a>(&self, row: &'a SourceRow, field: &str) -> Result<&'a FieldValue, SchemaError> {
        let index = self
            .fields
            .get(field)
            .ok_or_else(|| SchemaError::MissingFields {
                fields: vec![field.to_string()],
            })?;

        row.values.get(index).ok_or_else(|| SchemaError::MissingValue {
            object_id: row.object_id,
            field: field.to_string(),
            index,
        })
    }

    fn text(&self, row: &SourceRow, field: &str) -> Result<String, SchemaError> {
        Ok(self.value(row, field)?.as_text().trim().to_string())
    }

    fn number(&self, row: &SourceRow, field: &str) -> Result<i64, SchemaError> {
        let value = self.value(row, field)?;
        value.as_number().ok_or_else(|| SchemaError::InvalidNumber {
            object_id: row.object_id,
            field: field.to_string(),
            value: value.as_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;

    fn current_schema() -> Schema {
        let mut fields: Vec<Field> = RoadsSchemaVersion::Current
            .attribute_fields()
            .into_iter()
            .map(Field::new)
            .collect();
        fields.push(Field::new("SHAPE"));
        Schema::new(fields)
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn current_row() -> SourceRow {
        SourceRow {
            object_id: 12,
            values: vec![
                text("SALT LAKE CITY"),
                text("SALT LAKE CITY"),
                FieldValue::Integer(101),
                FieldValue::Integer(199),
                FieldValue::Double(100.0),
                FieldValue::Integer(198),
                text("N"),
                text(" MAIN "),
                text("ST"),
                text(""),
                text("STATE"),
                text("ST"),
                FieldValue::Null,
                FieldValue::Null,
                text("1300"),
                text("E"),
                text("84101"),
                text("84101"),
                text("{ABC}"),
                text("10"),
                FieldValue::Blob(vec![1, 2, 3]),
            ],
        }
    }

    #[test]
    fn detects_current_schema() {
        assert_eq!(
            RoadsSchemaVersion::detect(&current_schema()),
            RoadsSchemaVersion::Current
        );
    }

    #[test]
    fn detects_legacy_schema() {
        let mut fields: Vec<Field> = RoadsSchemaVersion::Legacy
            .attribute_fields()
            .into_iter()
            .map(Field::new)
            .collect();
        fields.push(Field::new("SHAPE"));
        let schema = Schema::new(fields);

        assert_eq!(
            RoadsSchemaVersion::detect(&schema),
            RoadsSchemaVersion::Legacy
        );
    }

    #[test]
    fn legacy_fields_share_one_address_system() {
        let fields = RoadsSchemaVersion::Legacy.attribute_fields();
        assert_eq!(fields.iter().filter(|f| **f == "ADDR_SYS").count(), 1);
        assert_eq!(RoadsSchemaVersion::Legacy.required_fields().len(), 5);
    }

    #[test]
    fn decodes_current_row() {
        let index = RoadFieldIndex::build(&current_schema(), DEFAULT_GEOMETRY_FIELD).unwrap();
        let segment = index.decode(&current_row()).unwrap();

        assert_eq!(segment.object_id, 12);
        assert_eq!(segment.name, "MAIN");
        assert_eq!(segment.range, AddressRange::new(101, 199, 100, 198));
        assert_eq!(segment.alias1_name, "STATE");
        assert_eq!(segment.alias2_name, "");
        assert_eq!(segment.acs_name, "1300");
        assert_eq!(segment.geometry, Geometry(vec![1, 2, 3]));
    }

    #[test]
    fn legacy_row_fills_both_address_systems() {
        let mut fields: Vec<Field> = RoadsSchemaVersion::Legacy
            .attribute_fields()
            .into_iter()
            .map(Field::new)
            .collect();
        fields.push(Field::new("SHAPE"));
        let schema = Schema::new(fields);
        let index = RoadFieldIndex::build(&schema, "SHAPE").unwrap();
        assert_eq!(index.version(), RoadsSchemaVersion::Legacy);

        // Legacy rows have one fewer column than current rows.
        let mut row = current_row();
        row.values.remove(1);
        let segment = index.decode(&row).unwrap();

        assert_eq!(segment.address_system_left, "SALT LAKE CITY");
        assert_eq!(segment.address_system_right, "SALT LAKE CITY");
    }

    #[test]
    fn missing_field_is_fatal() {
        let mut fields = current_schema().fields().to_vec();
        fields.retain(|f| f.name != "A2_NAME");
        let err = RoadFieldIndex::build(&Schema::new(fields), "SHAPE").unwrap_err();

        assert!(matches!(
            err,
            SchemaError::MissingFields { ref fields } if fields == &vec!["A2_NAME".to_string()]
        ));
    }

    #[test]
    fn missing_geometry_field_is_fatal() {
        assert!(RoadFieldIndex::build(&current_schema(), "GEOM").is_err());
    }

    #[test]
    fn non_numeric_range_is_rejected() {
        let index = RoadFieldIndex::build(&current_schema(), "SHAPE").unwrap();
        let mut row = current_row();
        row.values[2] = text("ten");

        assert!(matches!(
            index.decode(&row),
            Err(SchemaError::InvalidNumber { object_id: 12, .. })
        ));
    }

    #[test]
    fn short_row_is_rejected() {
        let index = RoadFieldIndex::build(&current_schema(), "SHAPE").unwrap();
        let mut row = current_row();
        row.values.truncate(5);

        assert!(matches!(
            index.decode(&row),
            Err(SchemaError::MissingValue { .. })
        ));
    }
}
