//! Sample records: one denormalized row per sample, in nested and flat form.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::value::{json_sample_value, parse_non_finite, LabelSet, QueryValue, METRIC_NAME_LABEL};

/// Reserved keys of a flat record, written before any label
pub const METRIC_KEY: &str = "metric";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const VALUE_KEY: &str = "value";

/// One sample together with its series' name and labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub metric: String,
    pub labels: LabelSet,
    pub timestamp: i64,
    #[serde(with = "json_sample_value")]
    pub value: f64,
}

/// Scalar stored under one key of a flat record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int64(_) => "int64",
            FieldValue::Float64(_) => "float64",
            FieldValue::String(_) => "string",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar, keeping integers and floats apart.
    /// Arrays and objects have no flat representation and become `Null`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int64(i)
                } else if let Some(f) = n.as_f64() {
                    FieldValue::Float64(f)
                } else {
                    FieldValue::Null
                }
            }
            serde_json::Value::String(s) => FieldValue::String(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => FieldValue::Null,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int64(v) => serializer.serialize_i64(*v),
            FieldValue::Float64(v) => json_sample_value::serialize(v, serializer),
            FieldValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float64(v)
    }
}

/// A sample record with its labels lifted to top-level keys.
///
/// Keys keep insertion order. Writing an existing key replaces its value in
/// place, so a label called `metric`, `timestamp` or `value` overwrites the
/// reserved field while keeping its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatRecord(IndexMap<String, FieldValue>);

/// A non-finite sample value is written as a string; read it back as a float
fn restore_sample_value(fields: &mut IndexMap<String, FieldValue>) {
    let restored = match fields.get(VALUE_KEY) {
        Some(FieldValue::String(text)) => parse_non_finite(text),
        _ => None,
    };
    if let Some(value) = restored {
        fields.insert(VALUE_KEY.to_string(), FieldValue::Float64(value));
    }
}

impl<'de> Deserialize<'de> for FlatRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = IndexMap::<String, FieldValue>::deserialize(deserializer)?;
        restore_sample_value(&mut fields);
        Ok(FlatRecord(fields))
    }
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sample(record: &SampleRecord) -> Self {
        let mut flat = FlatRecord(IndexMap::with_capacity(3 + record.labels.len()));
        flat.insert(METRIC_KEY, record.metric.as_str());
        flat.insert(TIMESTAMP_KEY, record.timestamp);
        flat.insert(VALUE_KEY, record.value);
        for (name, value) in &record.labels {
            flat.insert(name.as_str(), value.as_str());
        }
        flat
    }

    /// Build from a JSON object, e.g. one element of the flat JSON output
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut fields: IndexMap<String, FieldValue> = object
            .iter()
            .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
            .collect();
        restore_sample_value(&mut fields);
        FlatRecord(fields)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("not a prometheus matrix: got a {0} result")]
    NotMatrix(&'static str),
}

/// Expand query results into one record per sample.
///
/// Order is value order, then series order, then sample order. Any
/// non-matrix value rejects the whole input before a record is produced.
pub fn to_sample_records(values: Vec<QueryValue>) -> Result<Vec<SampleRecord>, ShapeError> {
    let mut matrices = Vec::with_capacity(values.len());
    for value in values {
        match value {
            QueryValue::Matrix(series) => matrices.push(series),
            other => return Err(ShapeError::NotMatrix(other.kind())),
        }
    }

    let total: usize = matrices
        .iter()
        .flat_map(|m| m.iter().map(|s| s.values.len()))
        .sum();
    let mut records = Vec::with_capacity(total);

    for series in matrices.into_iter().flatten() {
        let mut labels = series.metric;
        let metric = labels.remove(METRIC_NAME_LABEL).unwrap_or_default();
        for pair in series.values {
            records.push(SampleRecord {
                metric: metric.clone(),
                labels: labels.clone(),
                timestamp: pair.timestamp,
                value: pair.value,
            });
        }
    }

    Ok(records)
}

pub fn flatten_records(records: &[SampleRecord]) -> Vec<FlatRecord> {
    records.iter().map(FlatRecord::from_sample).collect()
}
