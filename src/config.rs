//! Configuration errors shared by every named option (layout, format,
//! compression, HTTP backend) and by the command-line value parsers.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown {kind}: {value}")]
    Unknown { kind: &'static str, value: String },

    #[error("Invalid timestamp {value:?}: expected UTC time as YYYY-MM-DDTHH:MM:SS")]
    Timestamp { value: String },

    #[error("Invalid duration {value:?}: {reason}")]
    Duration { value: String, reason: String },

    #[error("Invalid client certificate {}: {reason}", path.display())]
    Certificate { path: PathBuf, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub fn unknown(kind: &'static str, value: &str) -> Self {
        ConfigError::Unknown {
            kind,
            value: value.to_string(),
        }
    }
}
