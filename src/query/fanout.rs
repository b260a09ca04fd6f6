//! Query execution: one query, many queries against one source, and every
//! query against every source.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use super::{
    MultiQueryConfig, ProductQueryConfig, QueryConfig, QueryError, RangeQuerier, SourceError,
};
use crate::client::ClientError;
use crate::model::QueryValue;

/// Execute one query against one source.
///
/// Warnings attached to a successful result are logged, not returned.
pub async fn single<Q: RangeQuerier + ?Sized>(
    querier: &Q,
    url: &str,
    config: &QueryConfig,
    cancel: &CancellationToken,
) -> Result<QueryValue, ClientError> {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
        result = querier.query_range(url, &config.query, &config.timerange) => result?,
    };

    for warning in &result.warnings {
        tracing::warn!(source = %url, query = %config.query, "Prometheus API warning: {}", warning);
    }

    Ok(result.value)
}

/// Execute each query against one source in order.
///
/// The first failure aborts the remaining queries; nothing is returned for
/// the source in that case.
pub async fn multi<Q: RangeQuerier + ?Sized>(
    querier: &Q,
    url: &str,
    config: &MultiQueryConfig,
    cancel: &CancellationToken,
) -> Result<Vec<QueryValue>, ClientError> {
    let mut values = Vec::with_capacity(config.queries.len());

    for query in &config.queries {
        let query_config = QueryConfig {
            timerange: config.timerange,
            query: query.clone(),
        };
        tracing::debug!(source = %url, query = %query, "Executing range query");
        values.push(single(querier, url, &query_config, cancel).await?);
    }

    Ok(values)
}

/// Execute every query against every source concurrently.
///
/// Waits for all sources. If any source failed, every failure is returned
/// in one aggregated error and the results of the other sources are
/// dropped.
pub async fn product<Q: RangeQuerier + ?Sized>(
    querier: &Q,
    config: &ProductQueryConfig,
    cancel: &CancellationToken,
) -> Result<Vec<QueryValue>, QueryError> {
    let workers: Vec<_> = config
        .urls
        .iter()
        .map(|url| async move { (url, multi(querier, url, &config.multi, cancel).await) })
        .collect();

    let outcomes = join_all(workers).await;

    let mut values = Vec::new();
    let mut errors = Vec::new();
    for (url, outcome) in outcomes {
        match outcome {
            Ok(v) => values.extend(v),
            Err(error) => {
                tracing::debug!(source = %url, "Source failed: {}", error);
                errors.push(SourceError {
                    url: url.clone(),
                    error,
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(QueryError::Aggregate(errors));
    }

    tracing::info!(
        sources = config.urls.len(),
        queries = config.multi.queries.len(),
        values = values.len(),
        "Fetched query results"
    );
    Ok(values)
}
