//! Compression applied to marshaled output before it is written:
//! - None: bytes pass through untouched
//! - Gzip: for consumers expecting `.gz` files
//! - LZ4: frame format, fast enough for large parquet dumps

pub mod gzip;
pub mod lz4;

use std::str::FromStr;

use crate::config::ConfigError;
pub use gzip::GzipCompressor;
pub use lz4::Lz4Compressor;

/// Compression algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Lz4,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Lz4 => "lz4",
        }
    }
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "lz4" => Ok(Compression::Lz4),
            other => Err(ConfigError::unknown("compression", other)),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for whole-buffer compressors
pub trait Compressor: Send + Sync {
    /// Compress data and return compressed bytes
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Get compression type
    fn compression(&self) -> Compression;
}

/// Compress a marshaled buffer with the selected algorithm
pub fn compress(data: Vec<u8>, compression: Compression) -> Result<Vec<u8>, CompressionError> {
    let original_size = data.len();
    let compressed = match compression {
        Compression::None => return Ok(data),
        Compression::Gzip => GzipCompressor::new().compress(&data)?,
        Compression::Lz4 => Lz4Compressor::new().compress(&data)?,
    };

    tracing::debug!(
        algorithm = %compression,
        original_size,
        compressed_size = compressed.len(),
        "Compressed output"
    );
    Ok(compressed)
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Failed to compress: {0}")]
    CompressionFailed(String),
}
