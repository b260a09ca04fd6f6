pub mod http;
pub mod prometheus;

pub use http::{make_http_client, HttpBackend};
pub use prometheus::{ClientError, MetricMetadata, PromClient};
