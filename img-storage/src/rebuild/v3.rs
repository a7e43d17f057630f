//! V3 rebuilder (extended table format)
//!
//! One file: 20-byte header, the fixed 16-byte records, then the names
//! block (null-terminated, record order) — mirroring the reader's two-pass
//! shape. Record metadata parsed at open time is written back unchanged.
//!
//! The encrypted variant has no rebuild path; the caller rejects it before
//! dispatching here.

use std::path::Path;

use crate::detect::V3_MAGIC;
use crate::entry::Entry;
use crate::error::{ImgError, Result};
use crate::read::v3::{FLAGS_MASK, HEADER_SIZE, MAX_ENTRY_SIZE, RECORD_SIZE, SIZE_SHIFT, V3_VERSION};
use crate::rebuild::{SectorWriter, write_data_region};
use crate::types::SECTOR_SIZE;

/// Directory footprint in bytes (header + records + names), before sector
/// rounding.
pub(crate) fn directory_size(entries: &[Entry]) -> u64 {
    let names: u64 = entries.iter().map(|e| e.name().len() as u64 + 1).sum();
    HEADER_SIZE + entries.len() as u64 * RECORD_SIZE + names
}

pub(crate) fn write(
    path: &Path,
    entries: &[Entry],
    payloads: &[Vec<u8>],
    offsets: &[u64],
    data_start: u64,
) -> Result<()> {
    let names_len: u64 = entries.iter().map(|e| e.name().len() as u64 + 1).sum();
    let table_size = entries.len() as u64 * RECORD_SIZE + names_len;

    let mut directory = Vec::with_capacity((HEADER_SIZE + table_size) as usize);
    directory.extend_from_slice(&V3_MAGIC.to_le_bytes());
    directory.extend_from_slice(&V3_VERSION.to_le_bytes());
    directory.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    directory.extend_from_slice(&(table_size as u32).to_le_bytes());
    directory.extend_from_slice(&(RECORD_SIZE as u32).to_le_bytes());

    for (entry, offset) in entries.iter().zip(offsets) {
        if entry.size() > MAX_ENTRY_SIZE {
            return Err(ImgError::Validation(format!(
                "entry '{}' is {} bytes, the extended size field holds at most {MAX_ENTRY_SIZE}",
                entry.name(),
                entry.size()
            )));
        }
        let packed = (entry.size() << SIZE_SHIFT) | (entry.flags() & FLAGS_MASK);

        directory.extend_from_slice(&entry.resource_meta.to_le_bytes());
        directory.extend_from_slice(&entry.resource_type.to_le_bytes());
        directory.extend_from_slice(&((offset / SECTOR_SIZE) as u32).to_le_bytes());
        directory.extend_from_slice(&packed.to_le_bytes());
    }

    // Names block only after the full record table, matching the reader.
    for entry in entries {
        directory.extend_from_slice(entry.name().as_bytes());
        directory.push(0);
    }

    let mut writer = SectorWriter::create(path)?;
    writer.write(&directory)?;
    writer.pad_to(data_start)?;
    write_data_region(&mut writer, offsets, payloads)?;
    writer.finish()
}
