//! Inventory of the metrics a source exposes, with their label names.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, PromClient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub name: String,
    pub help: String,
}

/// One metadata entry of a metric together with the metric's label names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDump {
    #[serde(flatten)]
    pub info: MetricInfo,
    pub labels: Vec<String>,
}

fn log_warnings(url: &str, warnings: &[String]) {
    for warning in warnings {
        tracing::warn!(source = %url, "Prometheus API warning: {}", warning);
    }
}

/// List every metric of a source with its help text and label names.
///
/// Label names are fetched once per distinct metric name. Output is sorted
/// by metric name; a metric with several metadata entries appears once per
/// entry.
pub async fn metrics_with_labels(
    client: &PromClient,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<MetricDump>, ClientError> {
    let (metadata, warnings) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
        result = client.metadata(url) => result?,
    };
    log_warnings(url, &warnings);

    let mut metrics: Vec<MetricInfo> = metadata
        .into_iter()
        .flat_map(|(name, entries)| {
            entries.into_iter().map(move |entry| MetricInfo {
                name: name.clone(),
                help: entry.help,
            })
        })
        .collect();
    metrics.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.help.cmp(&b.help)));

    let unique: BTreeSet<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
    let mut labels_by_metric: HashMap<String, Vec<String>> = HashMap::with_capacity(unique.len());
    for name in unique {
        let (labels, warnings) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            result = client.label_names(url, name) => result?,
        };
        log_warnings(url, &warnings);
        labels_by_metric.insert(name.to_string(), labels);
    }

    tracing::info!(source = %url, metrics = labels_by_metric.len(), "Collected metric inventory");

    Ok(metrics
        .into_iter()
        .map(|info| {
            let labels = labels_by_metric.get(&info.name).cloned().unwrap_or_default();
            MetricDump { info, labels }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn metadata() -> Json<serde_json::Value> {
        Json(json!({
            "status": "success",
            "data": {
                "up": [{"type": "gauge", "help": "Target is up", "unit": ""}],
                "http_requests_total": [
                    {"type": "counter", "help": "Requests served", "unit": ""},
                    {"type": "counter", "help": "All requests", "unit": ""}
                ]
            }
        }))
    }

    async fn labels(Query(params): Query<Vec<(String, String)>>) -> Json<serde_json::Value> {
        let metric = params
            .into_iter()
            .find(|(k, _)| k == "match[]")
            .map(|(_, v)| v)
            .unwrap_or_default();
        let names = match metric.as_str() {
            "up" => json!(["__name__", "instance", "job"]),
            _ => json!(["__name__", "code", "method"]),
        };
        Json(json!({"status": "success", "data": names}))
    }

    async fn spawn_prometheus() -> String {
        let app = Router::new()
            .route("/api/v1/metadata", get(metadata))
            .route("/api/v1/labels", get(labels));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_metrics_with_labels() {
        let url = spawn_prometheus().await;
        let client = PromClient::new(reqwest::Client::new());

        let dumps = metrics_with_labels(&client, &url, &CancellationToken::new())
            .await
            .unwrap();

        let summary: Vec<(&str, &str, usize)> = dumps
            .iter()
            .map(|d| (d.info.name.as_str(), d.info.help.as_str(), d.labels.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("http_requests_total", "All requests", 3),
                ("http_requests_total", "Requests served", 3),
                ("up", "Target is up", 3),
            ]
        );
        assert_eq!(dumps[2].labels, vec!["__name__", "instance", "job"]);

        let encoded = serde_json::to_value(&dumps[2]).unwrap();
        assert_eq!(
            encoded,
            json!({"name": "up", "help": "Target is up", "labels": ["__name__", "instance", "job"]})
        );
    }

    #[tokio::test]
    async fn test_metrics_cancelled() {
        let client = PromClient::new(reqwest::Client::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = metrics_with_labels(&client, "http://127.0.0.1:1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }
}
