//! Payload compression applied before write and after read.

use std::io::{Read, Write};
use std::sync::Arc;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::cache::CacheError;

/// Reversible byte transform for cache payloads.
pub trait PayloadCodec: Send + Sync {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, CacheError>;

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>, CacheError>;
}

/// Stores payloads as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCodec;

impl PayloadCodec for PlainCodec {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, CacheError> {
        Ok(payload.to_vec())
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>, CacheError> {
        Ok(stored.to_vec())
    }
}

/// zlib compression at a fixed level (1-9).
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    level: u32,
}

impl ZlibCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(1, 9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl PayloadCodec for ZlibCodec {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, CacheError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(payload)
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        encoder.finish().map_err(|e| CacheError::Codec(e.to_string()))
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>, CacheError> {
        let mut decoder = ZlibDecoder::new(stored);
        let mut payload = Vec::new();
        decoder
            .read_to_end(&mut payload)
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        Ok(payload)
    }
}

/// Select the codec for a configured compression level; `0` disables compression.
pub fn codec_for_level(level: u32) -> Arc<dyn PayloadCodec> {
    if level == 0 {
        Arc::new(PlainCodec)
    } else {
        Arc::new(ZlibCodec::new(level))
    }
}
