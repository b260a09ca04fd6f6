//! promdump: dump Prometheus range queries as JSON or Parquet
//!
//! Runs a set of PromQL range queries against one or more Prometheus
//! servers over a shared time window, combines the results and writes them
//! out in one of three layouts.
//!
//! # Features
//!
//! - **Fan-out**: one concurrent worker per source, all-or-nothing results
//! - **Layouts**: raw API values, nested sample records, or flat rows
//! - **Formats**: JSON, or Parquet with a schema synthesized from the data
//! - **Compression**: none, gzip or LZ4 frames
//!
//! # Example
//!
//! ```no_run
//! use promdump::client::{make_http_client, HttpBackend, PromClient};
//! use promdump::model::{marshal, Format, Layout};
//! use promdump::query::{product, MultiQueryConfig, ProductQueryConfig, Timerange};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PromClient::new(make_http_client(HttpBackend::Http1, None)?);
//! let end = chrono::Utc::now();
//! let config = ProductQueryConfig {
//!     multi: MultiQueryConfig {
//!         timerange: Timerange {
//!             start: end - chrono::Duration::minutes(5),
//!             end,
//!             step: std::time::Duration::from_secs(60),
//!         },
//!         queries: vec!["up".to_string()],
//!     },
//!     urls: vec!["http://localhost:9090".to_string()],
//! };
//!
//! let values = product(&client, &config, &CancellationToken::new()).await?;
//! let json = marshal(values, Layout::Flat, Format::Json)?;
//! println!("{}", String::from_utf8_lossy(&json));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod compress;
pub mod config;
pub mod model;
pub mod query;

// Re-export commonly used types
pub use client::{ClientError, HttpBackend, PromClient};
pub use compress::{compress, Compression, CompressionError};
pub use config::ConfigError;
pub use model::{marshal, Format, Layout, MarshalError, QueryValue};
pub use query::{product, QueryError};
