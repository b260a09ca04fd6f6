//! Time-series values as returned by the Prometheus HTTP API.
//!
//! The JSON shape produced by `Serialize` matches what the API returns in
//! its `result` field, so the raw layout is a faithful passthrough.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the metric name of a series
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label name to label value mapping
pub type LabelSet = BTreeMap<String, String>;

/// One (timestamp, value) pair; timestamp in milliseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePair {
    pub timestamp: i64,
    pub value: f64,
}

impl SamplePair {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A labeled sequence of samples (one element of a matrix)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub metric: LabelSet,
    pub values: Vec<SamplePair>,
}

/// One element of an instant vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSample {
    pub metric: LabelSet,
    pub value: SamplePair,
}

/// A string result with its evaluation timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct StringSample {
    pub timestamp: i64,
    pub value: String,
}

/// Result of one query against one source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Matrix(Vec<Series>),
    Vector(Vec<InstantSample>),
    Scalar(SamplePair),
    String(StringSample),
}

impl QueryValue {
    /// The API's `resultType` name for this value
    pub fn kind(&self) -> &'static str {
        match self {
            QueryValue::Matrix(_) => "matrix",
            QueryValue::Vector(_) => "vector",
            QueryValue::Scalar(_) => "scalar",
            QueryValue::String(_) => "string",
        }
    }

    /// Decode an API `result` payload according to its `resultType`
    pub fn from_result(
        result_type: &str,
        result: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        match result_type {
            "matrix" => serde_json::from_value(result).map(QueryValue::Matrix),
            "vector" => serde_json::from_value(result).map(QueryValue::Vector),
            "scalar" => serde_json::from_value(result).map(QueryValue::Scalar),
            "string" => serde_json::from_value(result).map(QueryValue::String),
            other => Err(de::Error::custom(format!(
                "unknown result type: {}",
                other
            ))),
        }
    }
}

/// Render a sample value the way the API does (`NaN`, `+Inf`, `-Inf`)
pub fn format_sample_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

pub fn parse_sample_value(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => s.parse().ok(),
    }
}

/// Parse only the spellings [`format_sample_value`] uses for non-finite values
pub fn parse_non_finite(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "+Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// Serde adapter for sample values in JSON output.
///
/// Finite values are plain numbers. JSON has no NaN or infinity, so those
/// are written as the API strings and accepted back in either form.
pub mod json_sample_value {
    use serde::de;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_sample_value, parse_sample_value};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(&format_sample_value(*value))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => parse_sample_value(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid sample value: {:?}", text))),
        }
    }
}

fn millis_to_seconds(timestamp: i64) -> f64 {
    timestamp as f64 / 1000.0
}

fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

impl Serialize for SamplePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&millis_to_seconds(self.timestamp))?;
        tuple.serialize_element(&format_sample_value(self.value))?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for SamplePair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (seconds, raw): (f64, String) = Deserialize::deserialize(deserializer)?;
        let value = parse_sample_value(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid sample value: {:?}", raw)))?;
        Ok(SamplePair {
            timestamp: seconds_to_millis(seconds),
            value,
        })
    }
}

impl Serialize for StringSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&millis_to_seconds(self.timestamp))?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for StringSample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (seconds, value): (f64, String) = Deserialize::deserialize(deserializer)?;
        Ok(StringSample {
            timestamp: seconds_to_millis(seconds),
            value,
        })
    }
}
