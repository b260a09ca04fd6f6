pub mod fanout;
pub mod metrics;

pub use fanout::{multi, product, single};
pub use metrics::{metrics_with_labels, MetricDump, MetricInfo};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::client::ClientError;
use crate::model::QueryValue;

/// Time window shared by every query of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timerange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub timerange: Timerange,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct MultiQueryConfig {
    pub timerange: Timerange,
    pub queries: Vec<String>,
}

/// Every query against every source
#[derive(Debug, Clone)]
pub struct ProductQueryConfig {
    pub multi: MultiQueryConfig,
    pub urls: Vec<String>,
}

/// A successful range query with any warnings the source attached
#[derive(Debug, Clone)]
pub struct RangeResult {
    pub value: QueryValue,
    pub warnings: Vec<String>,
}

/// Remote range-query function the orchestrator fans out over
#[async_trait]
pub trait RangeQuerier: Send + Sync {
    async fn query_range(
        &self,
        source: &str,
        query: &str,
        range: &Timerange,
    ) -> Result<RangeResult, ClientError>;
}

/// Failure of one source during a fan-out
#[derive(Debug, thiserror::Error)]
#[error("{url}: {error}")]
pub struct SourceError {
    pub url: String,
    #[source]
    pub error: ClientError,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{}", describe_failures(.0))]
    Aggregate(Vec<SourceError>),
}

impl QueryError {
    /// Every source that failed, in the order the failures were collected
    pub fn failed_sources(&self) -> Vec<&str> {
        match self {
            QueryError::Aggregate(errors) => errors.iter().map(|e| e.url.as_str()).collect(),
        }
    }
}

fn describe_failures(errors: &[SourceError]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(
        "query failed on {} source(s):\n  {}",
        errors.len(),
        lines.join("\n  ")
    )
}
