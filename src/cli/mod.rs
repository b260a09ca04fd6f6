pub mod handlers;
pub mod time;

pub use handlers::{dump, run, DumpConfig};
pub use time::{parse_duration, parse_timestamp};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{ClientError, HttpBackend};
use crate::compress::{Compression, CompressionError};
use crate::config::ConfigError;
use crate::model::{Format, Layout, MarshalError};
use crate::query::{QueryError, Timerange};

#[derive(Debug, Parser)]
#[command(name = "promdump", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// HTTP backend: http1 or http2
    #[arg(short = 'b', long, global = true, env = "PROMDUMP_BACKEND", default_value = "http1")]
    pub backend: HttpBackend,

    /// PEM file holding a client certificate and its private key
    #[arg(long, global = true, env = "PROMDUMP_CLIENT_CERT", value_name = "FILE")]
    pub client_cert: Option<PathBuf>,

    /// Output format: json or parquet
    #[arg(short = 'f', long, global = true, env = "PROMDUMP_FORMAT", default_value = "json")]
    pub format: Format,

    /// Output layout: raw, nested or flat
    #[arg(short = 'l', long, global = true, env = "PROMDUMP_LAYOUT", default_value = "flat")]
    pub layout: Layout,

    /// Output compression: none, gzip or lz4
    #[arg(short = 'c', long, global = true, env = "PROMDUMP_COMPRESS", default_value = "none")]
    pub compress: Compression,

    /// Start of the window in UTC, YYYY-MM-DDTHH:MM:SS [default: 5 minutes ago]
    #[arg(short = 's', long, global = true, value_parser = parse_timestamp)]
    pub start: Option<DateTime<Utc>>,

    /// End of the window in UTC, YYYY-MM-DDTHH:MM:SS [default: now]
    #[arg(short = 'e', long, global = true, value_parser = parse_timestamp)]
    pub end: Option<DateTime<Utc>>,

    /// Resolution step, e.g. 30s, 1m30s, 2h
    #[arg(short = 'S', long, global = true, default_value = "1m", value_parser = parse_duration)]
    pub step: Duration,
}

impl GlobalArgs {
    /// Resolve the query window, filling unset bounds relative to `now`
    pub fn timerange(&self, now: DateTime<Utc>) -> Timerange {
        Timerange {
            start: self.start.unwrap_or(now - chrono::Duration::minutes(5)),
            end: self.end.unwrap_or(now),
            step: self.step,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every query against every source and write the results to stdout
    Dump(DumpCommand),
    /// List the metrics of a source with their help text and label names
    Metrics(MetricsCommand),
    /// Print the version
    Version,
}

#[derive(Debug, Clone, Args)]
pub struct DumpCommand {
    /// Prometheus base URL, repeat for several sources
    #[arg(
        short = 'u',
        long = "url",
        env = "PROMDUMP_URL",
        value_delimiter = ',',
        required = true
    )]
    pub urls: Vec<String>,

    /// PromQL expressions to evaluate over the window
    #[arg(required = true, value_name = "QUERY")]
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct MetricsCommand {
    /// Prometheus base URL
    #[arg(short = 'u', long, env = "PROMDUMP_URL")]
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error("Failed to encode metric inventory: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
