//! Columnar schema inferred from a flat record.
//!
//! Only one representative record is inspected. Every other record written
//! against the schema must carry exactly the same keys with the same value
//! types; series with differing label sets are not merged into a union
//! schema and fail at write time instead.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use parquet::basic::Encoding;
use parquet::file::properties::{WriterProperties, WriterPropertiesBuilder};
use parquet::schema::types::ColumnPath;

use super::sample::{FieldValue, FlatRecord, METRIC_KEY, TIMESTAMP_KEY, VALUE_KEY};

/// Physical column type of a synthesized field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 byte array, dictionary encoded
    Text,
    /// INT64, delta-binary-packed
    Integer,
    /// DOUBLE
    Float,
}

impl ColumnType {
    pub fn for_value(value: &FieldValue) -> Result<Self, SchemaError> {
        match value {
            FieldValue::String(_) => Ok(ColumnType::Text),
            FieldValue::Int64(_) => Ok(ColumnType::Integer),
            FieldValue::Float64(_) => Ok(ColumnType::Float),
            other => Err(SchemaError::UnsupportedType(other.type_name())),
        }
    }

    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Text => DataType::Utf8,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
        }
    }

    pub fn matches(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (ColumnType::Text, FieldValue::String(_))
                | (ColumnType::Integer, FieldValue::Int64(_))
                | (ColumnType::Float, FieldValue::Float64(_))
        )
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Integer => write!(f, "INT64"),
            ColumnType::Float => write!(f, "DOUBLE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered field list, one entry per key of the representative record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Derive the schema from a single record, in that record's key order
    pub fn synthesize(record: &FlatRecord) -> Result<Self, SchemaError> {
        let fields = record
            .iter()
            .map(|(name, value)| {
                Ok(SchemaField {
                    name: name.to_string(),
                    column_type: ColumnType::for_value(value)?,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(Self { fields })
    }

    /// The reserved columns every flat record starts with
    pub fn reserved() -> Self {
        let field = |name: &str, column_type| SchemaField {
            name: name.to_string(),
            column_type,
        };
        Self {
            fields: vec![
                field(METRIC_KEY, ColumnType::Text),
                field(TIMESTAMP_KEY, ColumnType::Integer),
                field(VALUE_KEY, ColumnType::Float),
            ],
        }
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Arrow schema with every column optional
    pub fn to_arrow(&self) -> Arc<ArrowSchema> {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(f.name.as_str(), f.column_type.arrow_type(), true))
            .collect();
        Arc::new(ArrowSchema::new(fields))
    }

    /// Parquet writer properties carrying the per-column encodings
    pub fn writer_properties(&self) -> WriterProperties {
        self.fields
            .iter()
            .fold(WriterProperties::builder(), |builder, field| {
                configure_column(builder, &field.name, field.column_type)
            })
            .build()
    }

    /// Check one record against the schema
    pub fn check(&self, index: usize, record: &FlatRecord) -> Result<(), SchemaError> {
        if let Some(key) = record.keys().find(|k| !self.fields.iter().any(|f| f.name == *k)) {
            return Err(SchemaError::UnexpectedField {
                record: index,
                field: key.to_string(),
            });
        }

        for field in &self.fields {
            match record.get(&field.name) {
                None => {
                    return Err(SchemaError::MissingField {
                        record: index,
                        field: field.name.clone(),
                    })
                }
                Some(value) if !field.column_type.matches(value) => {
                    return Err(SchemaError::TypeMismatch {
                        record: index,
                        field: field.name.clone(),
                        expected: field.column_type,
                        found: value.type_name(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

pub(crate) fn configure_column(
    builder: WriterPropertiesBuilder,
    name: &str,
    column_type: ColumnType,
) -> WriterPropertiesBuilder {
    let path = ColumnPath::from(name);
    match column_type {
        ColumnType::Text => builder.set_column_dictionary_enabled(path, true),
        ColumnType::Integer => builder
            .set_column_dictionary_enabled(path.clone(), false)
            .set_column_encoding(path, Encoding::DELTA_BINARY_PACKED),
        ColumnType::Float => builder,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown type {0} for parquet schema generation")]
    UnsupportedType(&'static str),

    #[error("record {record}: field {field:?} is not in the schema")]
    UnexpectedField { record: usize, field: String },

    #[error("record {record}: field {field:?} is missing")]
    MissingField { record: usize, field: String },

    #[error("record {record}: field {field:?} expected {expected}, found {found}")]
    TypeMismatch {
        record: usize,
        field: String,
        expected: ColumnType,
        found: &'static str,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FlatRecord {
        let mut record = FlatRecord::new();
        record.insert("metric", "up");
        record.insert("timestamp", 1000i64);
        record.insert("value", 1.0);
        record.insert("job", "node");
        record
    }

    #[test]
    fn test_synthesize_types_in_key_order() {
        let schema = Schema::synthesize(&record()).unwrap();
        let fields: Vec<(&str, ColumnType)> = schema
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.column_type))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("metric", ColumnType::Text),
                ("timestamp", ColumnType::Integer),
                ("value", ColumnType::Float),
                ("job", ColumnType::Text),
            ]
        );
    }

    #[test]
    fn test_reserved_schema_matches_label_free_record() {
        let mut bare = FlatRecord::new();
        bare.insert("metric", "up");
        bare.insert("timestamp", 1i64);
        bare.insert("value", 0.0);
        assert_eq!(Schema::reserved(), Schema::synthesize(&bare).unwrap());
    }

    #[test]
    fn test_unsupported_type() {
        let mut record = record();
        record.insert("healthy", FieldValue::Bool(true));
        let err = Schema::synthesize(&record).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedType("bool")));
    }

    #[test]
    fn test_arrow_schema_is_nullable() {
        let schema = Schema::synthesize(&record()).unwrap().to_arrow();
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
    }

    #[test]
    fn test_check_detects_deviations() {
        let schema = Schema::synthesize(&record()).unwrap();
        assert!(schema.check(0, &record()).is_ok());

        let mut extra = record();
        extra.insert("instance", "h1");
        assert!(matches!(
            schema.check(1, &extra),
            Err(SchemaError::UnexpectedField { record: 1, .. })
        ));

        let mut retyped = record();
        retyped.insert("job", 7i64);
        assert!(matches!(
            schema.check(2, &retyped),
            Err(SchemaError::TypeMismatch { record: 2, expected: ColumnType::Text, .. })
        ));

        let mut partial = FlatRecord::new();
        partial.insert("metric", "up");
        assert!(matches!(
            schema.check(3, &partial),
            Err(SchemaError::MissingField { record: 3, .. })
        ));
    }

    #[test]
    fn test_writer_properties_encodings() {
        let props = Schema::synthesize(&record()).unwrap().writer_properties();
        let timestamp = ColumnPath::from("timestamp");
        assert!(!props.dictionary_enabled(&timestamp));
        assert_eq!(props.encoding(&timestamp), Some(Encoding::DELTA_BINARY_PACKED));
        assert!(props.dictionary_enabled(&ColumnPath::from("job")));
    }
}
