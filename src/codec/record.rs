//! Record Codec
//!
//! Gzip-framed, big-endian serialization of a 1024-value overlay raster.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CacheError, Result};

/// Number of values in every record
pub const RECORD_LEN: usize = 1024;

/// Size of a record before compression
pub const RECORD_BYTES: usize = RECORD_LEN * 4;

/// Largest decompressed stream accepted before giving up
const MAX_STREAM_BYTES: usize = 64 * RECORD_BYTES;

/// One cached overlay raster
pub type Record = [i32; RECORD_LEN];

/// Encodes and decodes record blobs
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    level: Compression,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl RecordCodec {
    /// Create a codec compressing at `level` (0-9)
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }

    /// Serialize and compress a record
    pub fn encode(&self, values: &Record) -> Result<Vec<u8>> {
        let mut raw = BytesMut::with_capacity(RECORD_BYTES);
        for &value in values {
            raw.put_i32(value);
        }

        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    /// Decompress and deserialize a record
    ///
    /// The whole stream is read so the gzip CRC32 and length trailer are
    /// checked. Fails if the stream is not valid gzip, fails that check, or
    /// holds fewer than [`RECORD_LEN`] values. Bytes past the last value are
    /// ignored.
    pub fn decode(blob: &[u8]) -> Result<Record> {
        let mut raw = Vec::with_capacity(RECORD_BYTES);
        GzDecoder::new(blob)
            .take(MAX_STREAM_BYTES as u64 + 1)
            .read_to_end(&mut raw)
            .map_err(|e| CacheError::Decode(format!("malformed gzip stream: {}", e)))?;

        if raw.len() > MAX_STREAM_BYTES {
            return Err(CacheError::Decode(format!(
                "record stream exceeds {} bytes",
                MAX_STREAM_BYTES
            )));
        }

        if raw.len() < RECORD_BYTES {
            return Err(CacheError::Decode(format!(
                "expected {} bytes of record data, got {}",
                RECORD_BYTES,
                raw.len()
            )));
        }

        let mut buf = &raw[..];
        let mut values = [0i32; RECORD_LEN];
        for value in values.iter_mut() {
            *value = buf.get_i32();
        }
        Ok(values)
    }
}
