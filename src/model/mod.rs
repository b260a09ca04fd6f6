//! Time-series values and their conversion into output records.
//!
//! Query results flow through three stages: [`to_sample_records`] expands a
//! matrix into one [`SampleRecord`] per sample, [`flatten_records`] lifts
//! labels to top-level keys, and [`marshal`] encodes the records as JSON or
//! Parquet depending on the [`Layout`] and [`Format`].

pub mod columnar;
pub mod marshal;
pub mod sample;
pub mod schema;
pub mod value;

pub use marshal::{marshal, Format, Layout, MarshalError, Records};
pub use sample::{
    flatten_records, to_sample_records, FieldValue, FlatRecord, SampleRecord, ShapeError,
};
pub use schema::{ColumnType, Schema, SchemaError, SchemaField};
pub use value::{
    InstantSample, LabelSet, QueryValue, SamplePair, Series, StringSample, METRIC_NAME_LABEL,
};
