//! Gzip compression via flate2

use std::io::Write;

use flate2::write::GzEncoder;

use super::{Compression, CompressionError, Compressor};

#[derive(Debug, Clone, Default)]
pub struct GzipCompressor;

impl GzipCompressor {
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder = GzEncoder::new(
            Vec::with_capacity(data.len() / 2),
            flate2::Compression::default(),
        );
        encoder
            .write_all(data)
            .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
    }

    fn compression(&self) -> Compression {
        Compression::Gzip
    }
}

#[cfg(test)]
pub(crate) fn decode(data: &[u8]) -> Vec<u8> {
    use std::io::Read;

    let mut out = Vec::new();
    flate2::read::GzDecoder::new(data)
        .read_to_end(&mut out)
        .unwrap();
    out
}
