//! LZ4 frame compression
//!
//! Uses the frame format so output can be read back with the `lz4` CLI.

use std::io::Write;

use lz4_flex::frame::FrameEncoder;

use super::{Compression, CompressionError, Compressor};

/// LZ4 compressor
#[derive(Debug, Clone, Default)]
pub struct Lz4Compressor;

impl Lz4Compressor {
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for Lz4Compressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder = FrameEncoder::new(Vec::with_capacity(data.len() / 2));
        encoder
            .write_all(data)
            .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
    }

    fn compression(&self) -> Compression {
        Compression::Lz4
    }
}

#[cfg(test)]
pub(crate) fn decode(data: &[u8]) -> Vec<u8> {
    use std::io::Read;

    let mut out = Vec::new();
    lz4_flex::frame::FrameDecoder::new(data)
        .read_to_end(&mut out)
        .unwrap();
    out
}
