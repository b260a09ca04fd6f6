//! Parquet encoding of nested and flat sample records.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Builder, Int64Builder, MapBuilder, StringBuilder,
    StringDictionaryBuilder,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use super::sample::{FieldValue, FlatRecord, SampleRecord};
use super::schema::{configure_column, ColumnType, Schema, SchemaError};

/// Write a single batch into an in-memory parquet file
fn write_batch(batch: RecordBatch, props: WriterProperties) -> Result<Vec<u8>, SchemaError> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// Encode nested records against the fixed four-column layout:
/// `metric` (dictionary string), `labels` (string map), `timestamp` (INT64),
/// `value` (DOUBLE).
pub fn write_nested(records: &[SampleRecord]) -> Result<Vec<u8>, SchemaError> {
    let mut metric = StringDictionaryBuilder::<Int32Type>::new();
    let mut labels = MapBuilder::new(None, StringBuilder::new(), StringBuilder::new());
    let mut timestamp = Int64Builder::with_capacity(records.len());
    let mut value = Float64Builder::with_capacity(records.len());

    for record in records {
        metric.append_value(&record.metric);
        for (name, label_value) in &record.labels {
            labels.keys().append_value(name);
            labels.values().append_value(label_value);
        }
        labels.append(true)?;
        timestamp.append_value(record.timestamp);
        value.append_value(record.value);
    }

    let labels: ArrayRef = Arc::new(labels.finish());
    let schema = Arc::new(ArrowSchema::new(vec![
        Field::new(
            "metric",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            false,
        ),
        Field::new("labels", labels.data_type().clone(), false),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("value", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(metric.finish()),
        labels,
        Arc::new(timestamp.finish()),
        Arc::new(value.finish()),
    ];
    let batch = RecordBatch::try_new(schema, columns)?;

    let props =
        configure_column(WriterProperties::builder(), "timestamp", ColumnType::Integer).build();
    write_batch(batch, props)
}

enum ColumnBuilder {
    Text(StringBuilder),
    Integer(Int64Builder),
    Float(Float64Builder),
}

impl ColumnBuilder {
    fn new(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::Text => {
                ColumnBuilder::Text(StringBuilder::with_capacity(capacity, capacity * 8))
            }
            ColumnType::Integer => ColumnBuilder::Integer(Int64Builder::with_capacity(capacity)),
            ColumnType::Float => ColumnBuilder::Float(Float64Builder::with_capacity(capacity)),
        }
    }

    /// Caller guarantees the value matches the column type
    fn append(&mut self, value: &FieldValue) {
        match (self, value) {
            (ColumnBuilder::Text(b), FieldValue::String(s)) => b.append_value(s),
            (ColumnBuilder::Integer(b), FieldValue::Int64(v)) => b.append_value(*v),
            (ColumnBuilder::Float(b), FieldValue::Float64(v)) => b.append_value(*v),
            (ColumnBuilder::Text(b), _) => b.append_null(),
            (ColumnBuilder::Integer(b), _) => b.append_null(),
            (ColumnBuilder::Float(b), _) => b.append_null(),
        }
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Text(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Integer(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Float(mut b) => Arc::new(b.finish()),
        }
    }
}

/// Encode flat records against a schema synthesized from the first record.
///
/// Records are checked in order; the first one deviating from the schema
/// aborts the whole write. With no records the file holds only the reserved
/// columns and zero rows.
pub fn write_flat(records: &[FlatRecord]) -> Result<Vec<u8>, SchemaError> {
    let schema = match records.first() {
        Some(first) => Schema::synthesize(first)?,
        None => Schema::reserved(),
    };

    let mut builders: Vec<ColumnBuilder> = schema
        .fields()
        .iter()
        .map(|f| ColumnBuilder::new(f.column_type, records.len()))
        .collect();

    for (index, record) in records.iter().enumerate() {
        schema.check(index, record)?;
        for (field, builder) in schema.fields().iter().zip(builders.iter_mut()) {
            if let Some(value) = record.get(&field.name) {
                builder.append(value);
            }
        }
    }

    let columns: Vec<ArrayRef> = builders.into_iter().map(ColumnBuilder::finish).collect();
    let batch = RecordBatch::try_new(schema.to_arrow(), columns)?;
    write_batch(batch, schema.writer_properties())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::LabelSet;
    use arrow::array::{Float64Array, Int64Array, MapArray, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn read_back(buf: Vec<u8>) -> Vec<RecordBatch> {
        ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(buf))
            .unwrap()
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn sample(job: &str, timestamp: i64, value: f64) -> SampleRecord {
        SampleRecord {
            metric: "up".to_string(),
            labels: LabelSet::from([("job".to_string(), job.to_string())]),
            timestamp,
            value,
        }
    }

    #[test]
    fn test_nested_round_trip() {
        let records = vec![sample("a", 1000, 1.0), sample("b", 2000, 0.5)];
        let batches = read_back(write_nested(&records).unwrap());

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);

        let timestamps = batch
            .column_by_name("timestamp")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(timestamps.values().to_vec(), vec![1000, 2000]);

        let values = batch
            .column_by_name("value")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(values.value(1), 0.5);

        let labels = batch
            .column_by_name("labels")
            .unwrap()
            .as_any()
            .downcast_ref::<MapArray>()
            .unwrap();
        let first = labels.value(0);
        let keys = first.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        let vals = first.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(keys.value(0), "job");
        assert_eq!(vals.value(0), "a");
    }

    #[test]
    fn test_nested_empty_collection() {
        let buf = write_nested(&[]).unwrap();
        let rows: usize = read_back(buf).iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_flat_round_trip() {
        let records: Vec<FlatRecord> = [sample("a", 1000, 1.0), sample("b", 2000, 2.0)]
            .iter()
            .map(FlatRecord::from_sample)
            .collect();

        let batches = read_back(write_flat(&records).unwrap());
        let batch = &batches[0];
        let schema = batch.schema();
        let names: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["metric", "timestamp", "value", "job"]);

        let jobs = batch
            .column_by_name("job")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(jobs.value(0), "a");
        assert_eq!(jobs.value(1), "b");
        assert_eq!(jobs.null_count(), 0);
    }

    #[test]
    fn test_flat_second_record_with_new_key_fails() {
        let first = FlatRecord::from_sample(&sample("a", 1000, 1.0));
        let mut second = FlatRecord::from_sample(&sample("b", 2000, 2.0));
        second.insert("instance", "h1");

        let err = write_flat(&[first, second]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnexpectedField { record: 1, ref field } if field == "instance"
        ));
    }

    #[test]
    fn test_flat_empty_collection() {
        let batches = read_back(write_flat(&[]).unwrap());
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_flat_empty_collection_schema() {
        let buf = write_flat(&[]).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(buf)).unwrap();
        let schema = builder.schema();
        let columns: Vec<(&str, &DataType)> = schema
            .fields()
            .iter()
            .map(|f| (f.name().as_str(), f.data_type()))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("metric", &DataType::Utf8),
                ("timestamp", &DataType::Int64),
                ("value", &DataType::Float64),
            ]
        );
    }
}
