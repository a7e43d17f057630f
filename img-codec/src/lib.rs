//! Compression codec registry for IMG archive payloads
//!
//! IMG archives across game releases use a handful of mutually incompatible
//! compression schemes: the deflate family (zlib, gzip, raw deflate), LZ4
//! frames, zstd, and the fastman92 variants that wrap a codec's output in a
//! small fixed header. This crate provides compression and decompression for
//! all of them behind a single algorithm tag.

use std::fmt;

pub mod compress;
pub mod decompress;
pub mod error;
pub mod framed;

pub use compress::{CompressionResult, compress};
pub use decompress::{decompress, decompress_or_original, probe};
pub use error::{Error, Result};
pub use framed::FrameHeader;

/// Default compression level when the caller does not specify one.
pub const DEFAULT_LEVEL: u8 = 6;

/// Gzip member signature.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// LZ4 frame signature (little-endian 0x184D2204).
pub const LZ4_FRAME_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

/// Zstandard frame signature (little-endian 0xFD2FB528).
pub const ZSTD_FRAME_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression algorithm tag.
///
/// Store/none is not a codec; uncompressed entries are represented at the
/// archive layer and never routed through this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// zlib-wrapped deflate
    Zlib,
    /// gzip-wrapped deflate
    Gzip,
    /// Raw deflate, no container
    Deflate,
    /// LZ4 frame format
    Lz4,
    /// Zstandard
    Zstd,
    /// zlib behind a fastman92 frame header
    FramedZlib,
    /// LZ4 behind a fastman92 frame header
    FramedLz4,
}

impl Codec {
    /// Map a fastman92 directory compression id (entry flags, low 4 bits)
    /// to a codec tag. Id 0 means "stored" and has no codec.
    pub fn from_vendor_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::FramedZlib),
            2 => Some(Self::FramedLz4),
            _ => None,
        }
    }

    /// The fastman92 directory id for this codec, if it has one.
    pub fn vendor_id(self) -> Option<u8> {
        match self {
            Self::FramedZlib => Some(1),
            Self::FramedLz4 => Some(2),
            _ => None,
        }
    }

    /// True for the variants that carry a fastman92 frame header.
    pub fn is_framed(self) -> bool {
        matches!(self, Self::FramedZlib | Self::FramedLz4)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::FramedZlib => "fastman92-zlib",
            Self::FramedLz4 => "fastman92-lz4",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
