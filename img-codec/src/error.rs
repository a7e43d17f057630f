//! Error types for codec operations

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codec error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from an underlying encoder/decoder
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Algorithm id not recognized or not linked into this build
    #[error("Unsupported compression algorithm id: {0:#04x}")]
    UnsupportedAlgorithm(u8),

    /// Compression backend failed
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// Decompression backend failed
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Frame header shorter than the fixed 12 bytes, or payload shorter
    /// than the length the header claims
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    /// Decompressed output does not match the size recorded in the frame
    #[error("Frame size mismatch: header says {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
