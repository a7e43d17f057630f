//! Compression entry points
//!
//! Every algorithm produces the exact byte stream its matching decompressor
//! expects, including the fastman92 frame header for the framed variants.

use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use std::io::Write;
use tracing::trace;

use crate::framed::FrameHeader;
use crate::{Codec, DEFAULT_LEVEL, Error, Result};

/// Outcome of a compression call.
///
/// Transient value type; callers usually take `data` and drop the rest, but
/// the size accounting is kept around for ratio reporting.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub codec: Codec,
    pub level: u8,
    pub original_size: usize,
    pub data: Vec<u8>,
}

impl CompressionResult {
    pub fn compressed_size(&self) -> usize {
        self.data.len()
    }

    /// Compressed size over original size; 1.0 for empty input.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.data.len() as f64 / self.original_size as f64
        }
    }

    pub fn space_saved(&self) -> usize {
        self.original_size.saturating_sub(self.data.len())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Compress `data` with the given algorithm.
///
/// `level` is clamped to 0-9 and defaults to [`DEFAULT_LEVEL`]; it is
/// ignored by backends without a level knob.
pub fn compress(data: &[u8], codec: Codec, level: Option<u8>) -> Result<CompressionResult> {
    let level = level.unwrap_or(DEFAULT_LEVEL).min(9);
    trace!("compressing {} bytes with {codec} level {level}", data.len());

    let out = match codec {
        Codec::Zlib => compress_zlib(data, level)?,
        Codec::Gzip => compress_gzip(data, level)?,
        Codec::Deflate => compress_deflate(data, level)?,
        Codec::Lz4 => compress_lz4(data)?,
        Codec::Zstd => compress_zstd(data, level)?,
        Codec::FramedZlib => frame(data, compress_zlib(data, level)?)?,
        Codec::FramedLz4 => frame(data, compress_lz4(data)?)?,
    };

    Ok(CompressionResult {
        codec,
        level,
        original_size: data.len(),
        data: out,
    })
}

fn flate_level(level: u8) -> Compression {
    match level {
        0 => Compression::none(),
        9 => Compression::best(),
        n => Compression::new(u32::from(n)),
    }
}

fn compress_zlib(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate_level(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn compress_gzip(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate_level(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn compress_deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), flate_level(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn compress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    encoder.write_all(data)?;
    encoder
        .finish()
        .map_err(|e| Error::CompressionFailed(format!("LZ4 frame: {e}")))
}

fn compress_zstd(data: &[u8], level: u8) -> Result<Vec<u8>> {
    zstd::stream::encode_all(data, i32::from(level.max(1)))
        .map_err(|e| Error::CompressionFailed(format!("zstd: {e}")))
}

/// Prefix codec output with the fastman92 frame header.
fn frame(original: &[u8], compressed: Vec<u8>) -> Result<Vec<u8>> {
    let original_size = u32::try_from(original.len())
        .map_err(|_| Error::CompressionFailed("payload exceeds frame size field".into()))?;
    let compressed_size = u32::try_from(compressed.len())
        .map_err(|_| Error::CompressionFailed("output exceeds frame size field".into()))?;

    let mut out = Vec::with_capacity(compressed.len() + crate::framed::FRAME_HEADER_LEN);
    FrameHeader::new(original_size, compressed_size).write_to(&mut out);
    out.extend_from_slice(&compressed);
    Ok(out)
}
