//! Per-layout archive rebuilders
//!
//! Rebuild regenerates the on-disk bytes from the current entry table:
//! compute the directory footprint, assign every entry the next free
//! sector-aligned offset in table order, write the directory mirroring the
//! reader's record layout, then write each payload zero-padded to its
//! sector boundary. Payloads are drained through the accessor before the
//! target is opened, so rebuilding onto the source path is safe.

pub(crate) mod v1;
pub(crate) mod v2;
pub(crate) mod v3;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::entry::Entry;
use crate::error::Result;
use crate::types::{SECTOR_SIZE, sector_round_up};

/// Buffered file writer that tracks its position for alignment padding.
pub(crate) struct SectorWriter {
    writer: BufWriter<File>,
    position: u64,
}

impl SectorWriter {
    pub(crate) fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            position: 0,
        })
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Zero-fill up to an absolute offset. Offsets behind the cursor are a
    /// caller bug and only happen if offset assignment is broken.
    pub(crate) fn pad_to(&mut self, offset: u64) -> Result<()> {
        debug_assert!(offset >= self.position);
        while self.position < offset {
            let chunk = (offset - self.position).min(SECTOR_SIZE) as usize;
            self.writer.write_all(&[0u8; SECTOR_SIZE as usize][..chunk])?;
            self.position += chunk as u64;
        }
        Ok(())
    }

    /// Zero-fill to the next sector boundary.
    pub(crate) fn pad_to_sector(&mut self) -> Result<()> {
        self.pad_to(sector_round_up(self.position))
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Assign contiguous sector-aligned offsets in table order, starting at
/// the (already sector-rounded) data region.
pub(crate) fn assign_offsets(entries: &[Entry], data_start: u64) -> Vec<u64> {
    let mut cursor = data_start;
    entries
        .iter()
        .map(|entry| {
            let offset = cursor;
            cursor += entry.padded_size();
            offset
        })
        .collect()
}

/// Write a name into a fixed-width null-padded directory field.
pub(crate) fn write_name_field(out: &mut Vec<u8>, name: &str, width: usize) {
    let usable = width - 1;
    let bytes = name.as_bytes();
    if bytes.len() > usable {
        warn!("truncating name '{name}' to {usable} characters for the directory field");
    }
    let take = bytes.len().min(usable);
    out.extend_from_slice(&bytes[..take]);
    out.resize(out.len() + (width - take), 0);
}

/// Write payloads at their assigned offsets, each zero-padded to the
/// sector boundary.
pub(crate) fn write_data_region(
    writer: &mut SectorWriter,
    offsets: &[u64],
    payloads: &[Vec<u8>],
) -> Result<()> {
    for (offset, payload) in offsets.iter().zip(payloads) {
        writer.pad_to(*offset)?;
        writer.write(payload)?;
        writer.pad_to_sector()?;
    }
    Ok(())
}
