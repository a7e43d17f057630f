//! Archive layout detection
//!
//! Classifies a file by a short byte prefix, falling back to sidecar
//! presence for the headerless V1 pair. Failing to detect is an expected
//! outcome for files that simply are not archives, not an error.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::types::ImgVersion;

/// `VER2` single-file signature.
pub const V2_MAGIC: [u8; 4] = *b"VER2";

/// fastman92 `VERF` signature.
pub const VERF_MAGIC: [u8; 4] = *b"VERF";

/// Extended-layout magic (little-endian u32 at offset 0).
pub const V3_MAGIC: u32 = 0xA94E2A52;

/// Classify the on-disk layout of the file at `path`.
///
/// A recognized single-file magic always wins over sidecar-based detection,
/// since a stray `.dir` next to an unrelated file is coincidence. Returns
/// [`ImgVersion::Unknown`] when nothing matches; I/O failures propagate.
pub fn detect_version(path: &Path) -> Result<ImgVersion> {
    // A .dir path is the V1 directory itself; there is no magic to check.
    if has_extension(path, "dir") {
        return Ok(if data_path_for(path).is_file() {
            ImgVersion::V1
        } else {
            ImgVersion::Unknown
        });
    }

    let mut header = [0u8; 16];
    let read = File::open(path)?.read(&mut header)?;

    if read >= 4 {
        if header[..4] == V2_MAGIC {
            return Ok(ImgVersion::V2);
        }
        if header[..4] == VERF_MAGIC {
            return Ok(ImgVersion::Fastman92);
        }
        if LittleEndian::read_u32(&header[..4]) == V3_MAGIC {
            return Ok(ImgVersion::V3);
        }
    }

    // The V1 data file carries no header at all; sidecar presence is the
    // only signal.
    if directory_path_for(path).is_file() {
        debug!("no magic in {path:?}, but a .dir sidecar exists");
        return Ok(ImgVersion::V1);
    }

    Ok(ImgVersion::Unknown)
}

pub(crate) fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// The `.img` data file matching a V1 path (identity for non-.dir paths).
pub(crate) fn data_path_for(path: &Path) -> PathBuf {
    if has_extension(path, "dir") {
        path.with_extension("img")
    } else {
        path.to_path_buf()
    }
}

/// The `.dir` directory file matching a V1 path.
pub(crate) fn directory_path_for(path: &Path) -> PathBuf {
    path.with_extension("dir")
}
