//! V2 rebuilder (single file, `VER2` header)
//!
//! One file: 8-byte header with the embedded record count, the record
//! table, then the data region starting at the next sector boundary.
//! Sizes go into the streaming field; the archive-size field is left zero
//! the way retail archives have it.

use std::path::Path;

use crate::detect::V2_MAGIC;
use crate::entry::Entry;
use crate::error::{ImgError, Result};
use crate::rebuild::{SectorWriter, write_data_region, write_name_field};
use crate::types::SECTOR_SIZE;

pub(crate) const HEADER_SIZE: u64 = 8;
pub(crate) const RECORD_SIZE: u64 = 32;

/// Directory footprint in bytes, before sector rounding.
pub(crate) fn directory_size(entry_count: usize) -> u64 {
    HEADER_SIZE + entry_count as u64 * RECORD_SIZE
}

pub(crate) fn write(
    path: &Path,
    entries: &[Entry],
    payloads: &[Vec<u8>],
    offsets: &[u64],
    data_start: u64,
) -> Result<()> {
    let mut directory = Vec::with_capacity(directory_size(entries.len()) as usize);
    directory.extend_from_slice(&V2_MAGIC);
    directory.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    for (entry, offset) in entries.iter().zip(offsets) {
        let size_sectors = u16::try_from(entry.size_sectors()).map_err(|_| {
            ImgError::Validation(format!(
                "entry '{}' is too large for the VER2 size field",
                entry.name()
            ))
        })?;
        directory.extend_from_slice(&((offset / SECTOR_SIZE) as u32).to_le_bytes());
        directory.extend_from_slice(&0u16.to_le_bytes()); // archive size
        directory.extend_from_slice(&size_sectors.to_le_bytes()); // streaming size
        write_name_field(&mut directory, entry.name(), 24);
    }

    let mut writer = SectorWriter::create(path)?;
    writer.write(&directory)?;
    writer.pad_to(data_start)?;
    write_data_region(&mut writer, offsets, payloads)?;
    writer.finish()
}
