use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use crate::model::QueryValue;
use crate::query::{RangeQuerier, RangeResult, Timerange};

/// Client for the Prometheus HTTP API
#[derive(Debug, Clone)]
pub struct PromClient {
    http_client: reqwest::Client,
}

/// Metadata entry returned by `/api/v1/metadata`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricMetadata {
    #[serde(rename = "type", default)]
    pub metric_type: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub unit: String,
}

/// Envelope shared by every API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

impl PromClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    fn endpoint(source: &str, path: &str) -> String {
        format!("{}/api/v1/{}", source.trim_end_matches('/'), path)
    }

    /// Evaluate a range query on one source
    pub async fn query_range(
        &self,
        source: &str,
        query: &str,
        range: &Timerange,
    ) -> Result<RangeResult, ClientError> {
        let url = Self::endpoint(source, "query_range");
        let params = [
            ("query", query.to_string()),
            ("start", range.start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("end", range.end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("step", range.step.as_secs_f64().to_string()),
        ];

        let request = self.http_client.post(&url).form(&params);
        let (data, warnings): (QueryData, _) = self.send(request).await?;

        let value = QueryValue::from_result(&data.result_type, data.result)
            .map_err(|e| ClientError::Deserialization(e.to_string()))?;

        Ok(RangeResult { value, warnings })
    }

    /// Metadata for every metric a source knows about
    pub async fn metadata(
        &self,
        source: &str,
    ) -> Result<(HashMap<String, Vec<MetricMetadata>>, Vec<String>), ClientError> {
        let url = Self::endpoint(source, "metadata");
        self.send(self.http_client.get(&url)).await
    }

    /// Label names present on the series of one metric, over all time
    pub async fn label_names(
        &self,
        source: &str,
        metric: &str,
    ) -> Result<(Vec<String>, Vec<String>), ClientError> {
        let url = Self::endpoint(source, "labels");
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let request = self.http_client.get(&url).query(&[
            ("match[]", metric),
            ("start", "1970-01-01T00:00:00Z"),
            ("end", now.as_str()),
        ]);
        self.send(request).await
    }

    /// Send a request and unwrap the API envelope into data and warnings
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(T, Vec<String>), ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        // Error responses usually still carry the JSON envelope
        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(ClientError::Deserialization(e.to_string())),
        };

        if envelope.status != "success" {
            return Err(ClientError::Api {
                error_type: envelope.error_type.unwrap_or_default(),
                message: envelope.error.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| ClientError::Deserialization("response has no data".to_string()))?;
        Ok((data, envelope.warnings))
    }
}

#[async_trait]
impl RangeQuerier for PromClient {
    async fn query_range(
        &self,
        source: &str,
        query: &str,
        range: &Timerange,
    ) -> Result<RangeResult, ClientError> {
        PromClient::query_range(self, source, query, range).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Prometheus API error ({error_type}): {message}")]
    Api { error_type: String, message: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request cancelled")]
    Cancelled,
}
