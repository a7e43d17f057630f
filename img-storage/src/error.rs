//! Error types for archive operations

use std::io;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ImgError>;

#[derive(Error, Debug)]
pub enum ImgError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic or an on-disk layout the engine does not recognize
    #[error("Invalid archive format: {0}")]
    Format(String),

    /// Header or directory runs past end of file
    #[error("Truncated data: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: u64, actual: u64 },

    /// Entry name or mutation input rejected
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entry handle no longer resolves to a table slot
    #[error("Entry {0} not found")]
    NotFound(usize),

    /// Compression algorithm id from the directory is not implemented
    #[error("Unsupported compression algorithm id: {0:#04x}")]
    UnsupportedCompression(u8),

    /// Operation the layout deliberately does not support
    #[error("Operation not supported for this layout: {0}")]
    UnsupportedLayoutOperation(&'static str),

    #[error("Codec error: {0}")]
    Codec(#[from] img_codec::Error),
}
