//! Construction of the HTTP transport used by [`super::PromClient`].

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::ConfigError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Protocol the transport speaks to every source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpBackend {
    /// HTTP/1.1 only
    #[default]
    Http1,
    /// HTTP/2 with prior knowledge, no upgrade negotiation
    Http2,
}

impl FromStr for HttpBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http1" => Ok(HttpBackend::Http1),
            "http2" => Ok(HttpBackend::Http2),
            other => Err(ConfigError::unknown("http backend", other)),
        }
    }
}

/// Build the shared HTTP client.
///
/// `client_cert` points to a PEM file holding the client certificate and its
/// private key; it becomes the TLS identity for every request.
pub fn make_http_client(
    backend: HttpBackend,
    client_cert: Option<&Path>,
) -> Result<reqwest::Client, ConfigError> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);

    builder = match backend {
        HttpBackend::Http1 => builder.http1_only(),
        HttpBackend::Http2 => builder.http2_prior_knowledge(),
    };

    if let Some(path) = client_cert {
        let pem = std::fs::read(path).map_err(|e| ConfigError::Certificate {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let identity = reqwest::Identity::from_pem(&pem).map_err(|e| ConfigError::Certificate {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        builder = builder.identity(identity);
    }

    tracing::debug!(?backend, client_cert = ?client_cert, "Building HTTP client");

    builder
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}
