//! Marshaling of query results: one decision table over layout x format.

use std::str::FromStr;

use super::columnar::{write_flat, write_nested};
use super::sample::{flatten_records, to_sample_records, FlatRecord, SampleRecord, ShapeError};
use super::schema::SchemaError;
use super::value::QueryValue;
use crate::config::ConfigError;

/// Logical shape of the output records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Query results exactly as the API returned them
    Raw,
    /// One record per sample with a nested label map
    Nested,
    /// One record per sample with labels as top-level keys
    Flat,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Raw => "raw",
            Layout::Nested => "nested",
            Layout::Flat => "flat",
        }
    }
}

impl FromStr for Layout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Layout::Raw),
            "nested" => Ok(Layout::Nested),
            "flat" => Ok(Layout::Flat),
            other => Err(ConfigError::unknown("layout", other)),
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Parquet,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Parquet => "parquet",
        }
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "parquet" => Ok(Format::Parquet),
            other => Err(ConfigError::unknown("format", other)),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records tagged with their layout
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Raw(Vec<QueryValue>),
    Nested(Vec<SampleRecord>),
    Flat(Vec<FlatRecord>),
}

impl Records {
    /// Reshape query results into the requested layout
    pub fn from_values(values: Vec<QueryValue>, layout: Layout) -> Result<Self, ShapeError> {
        match layout {
            Layout::Raw => Ok(Records::Raw(values)),
            Layout::Nested => to_sample_records(values).map(Records::Nested),
            Layout::Flat => {
                let records = to_sample_records(values)?;
                Ok(Records::Flat(flatten_records(&records)))
            }
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            Records::Raw(_) => Layout::Raw,
            Records::Nested(_) => Layout::Nested,
            Records::Flat(_) => Layout::Flat,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Records::Raw(values) => values.len(),
            Records::Nested(records) => records.len(),
            Records::Flat(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, format: Format) -> Result<Vec<u8>, MarshalError> {
        match (self, format) {
            (Records::Raw(values), Format::Json) => Ok(serde_json::to_vec(values)?),
            (Records::Raw(_), Format::Parquet) => Err(MarshalError::Unsupported {
                layout: Layout::Raw,
                format: Format::Parquet,
            }),
            (Records::Nested(records), Format::Json) => Ok(serde_json::to_vec(records)?),
            (Records::Nested(records), Format::Parquet) => Ok(write_nested(records)?),
            (Records::Flat(records), Format::Json) => Ok(serde_json::to_vec(records)?),
            (Records::Flat(records), Format::Parquet) => Ok(write_flat(records)?),
        }
    }
}

/// Reshape and encode query results in one step
pub fn marshal(
    values: Vec<QueryValue>,
    layout: Layout,
    format: Format,
) -> Result<Vec<u8>, MarshalError> {
    let records = Records::from_values(values, layout)?;
    tracing::debug!(
        layout = %layout,
        format = %format,
        records = records.len(),
        "Marshaling records"
    );
    records.encode(format)
}

#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    #[error("serializing {layout} prometheus values to {format} is not supported")]
    Unsupported { layout: Layout, format: Format },

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::{LabelSet, SamplePair, Series, METRIC_NAME_LABEL};

    fn matrix(name: &str, job: &str, samples: &[(i64, f64)]) -> QueryValue {
        QueryValue::Matrix(vec![Series {
            metric: LabelSet::from([
                (METRIC_NAME_LABEL.to_string(), name.to_string()),
                ("job".to_string(), job.to_string()),
            ]),
            values: samples
                .iter()
                .map(|&(ts, v)| SamplePair::new(ts, v))
                .collect(),
        }])
    }

    #[test]
    fn test_unknown_names() {
        let err = "columnar".parse::<Layout>().unwrap_err();
        assert_eq!(err.to_string(), "unknown layout: columnar");

        let err = "csv".parse::<Format>().unwrap_err();
        assert_eq!(err.to_string(), "unknown format: csv");

        assert_eq!("flat".parse::<Layout>().unwrap(), Layout::Flat);
        assert_eq!("parquet".parse::<Format>().unwrap(), Format::Parquet);
    }

    #[test]
    fn test_raw_parquet_unsupported() {
        let err = marshal(vec![matrix("up", "a", &[(1, 1.0)])], Layout::Raw, Format::Parquet)
            .unwrap_err();
        assert!(matches!(err, MarshalError::Unsupported { .. }));
        assert_eq!(
            err.to_string(),
            "serializing raw prometheus values to parquet is not supported"
        );
    }

    #[test]
    fn test_raw_json_passthrough() {
        let bytes = marshal(
            vec![QueryValue::Scalar(SamplePair::new(1000, 2.0))],
            Layout::Raw,
            Format::Json,
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, serde_json::json!([[1.0, "2"]]));
    }

    #[test]
    fn test_nested_json_round_trip() {
        let values = vec![matrix("up", "a", &[(1000, 1.0), (2000, 0.0)])];
        let bytes = marshal(values.clone(), Layout::Nested, Format::Json).unwrap();

        let parsed: Vec<SampleRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, to_sample_records(values).unwrap());
        assert_eq!(parsed[0].labels["job"], "a");
    }

    #[test]
    fn test_flat_json_round_trip() {
        let values = vec![matrix("up", "a", &[(1000, 1.5)])];
        let bytes = marshal(values, Layout::Flat, Format::Json).unwrap();

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(
            text,
            r#"[{"metric":"up","timestamp":1000,"value":1.5,"job":"a"}]"#
        );

        let parsed: Vec<FlatRecord> = serde_json::from_slice(&bytes).unwrap();
        let keys: Vec<&str> = parsed[0].keys().collect();
        assert_eq!(keys, vec!["metric", "timestamp", "value", "job"]);
    }

    #[test]
    fn test_flat_parquet_heterogeneous_labels_fail() {
        let mut second = matrix("up", "b", &[(1000, 1.0)]);
        if let QueryValue::Matrix(series) = &mut second {
            series[0].metric.insert("instance".to_string(), "h1".to_string());
        }
        let values = vec![matrix("up", "a", &[(1000, 1.0)]), second];

        let err = marshal(values, Layout::Flat, Format::Parquet).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Schema(SchemaError::UnexpectedField { record: 1, .. })
        ));
    }

    #[test]
    fn test_non_matrix_rejected_before_encoding() {
        for layout in [Layout::Nested, Layout::Flat] {
            let err = marshal(
                vec![QueryValue::Scalar(SamplePair::new(0, 1.0))],
                layout,
                Format::Json,
            )
            .unwrap_err();
            assert!(matches!(err, MarshalError::Shape(ShapeError::NotMatrix("scalar"))));
        }
    }

    #[test]
    fn test_records_layout_tag() {
        let records =
            Records::from_values(vec![matrix("up", "a", &[(1, 1.0)])], Layout::Flat).unwrap();
        assert_eq!(records.layout(), Layout::Flat);
        assert_eq!(records.len(), 1);
    }
}
