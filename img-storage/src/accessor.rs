//! On-demand entry payload resolution
//!
//! Entries never own backing-file bytes. Resolution order: the pending
//! buffer (bytes handed to add/replace since the last rebuild) wins,
//! otherwise the stored extent is read from the data file, opened and
//! dropped per call. Decoding applies decompression lazily on top.

use std::path::Path;

use crate::entry::Entry;
use crate::error::{ImgError, Result};
use crate::source::{FileSource, PayloadSource};
use crate::types::Compression;

/// The entry's stored bytes, exactly as they sit in the backing file
/// (still compressed for compressed entries).
pub(crate) fn read_stored(data_path: &Path, entry: &Entry) -> Result<Vec<u8>> {
    if let Some(pending) = &entry.pending {
        return Ok(pending.clone());
    }

    let mut source = FileSource::open(data_path)?;
    source.read_at(entry.offset, entry.size as usize)
}

/// The entry's logical bytes: stored bytes run through the codec registry
/// when the directory marked them compressed.
///
/// Encrypted entries refuse outright — handing back ciphertext as if it
/// were the payload corrupts everything downstream.
pub(crate) fn read_decoded(data_path: &Path, entry: &Entry) -> Result<Vec<u8>> {
    if entry.encrypted {
        return Err(ImgError::UnsupportedLayoutOperation(
            "reading encrypted entry payloads",
        ));
    }

    let stored = read_stored(data_path, entry)?;
    match entry.compression {
        Compression::None => Ok(stored),
        Compression::Known(codec) => {
            let hint = if entry.uncompressed_size > 0 {
                Some(entry.uncompressed_size as usize)
            } else {
                None
            };
            Ok(img_codec::decompress(&stored, codec, hint)?)
        }
        Compression::Unknown(id) => Err(ImgError::UnsupportedCompression(id)),
    }
}
