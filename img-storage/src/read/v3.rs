//! V3 reader (extended table format)
//!
//! 20-byte header `u32 magic, u32 version=3, u32 entry_count,
//! u32 table_size, u32 record_size`, then fixed 16-byte records:
//! `u32 meta, u32 resource_type, u32 offset_sectors, u32 packed` where the
//! packed field holds the exact byte size in bits 11-31 and flag bits in
//! 0-10 (bit 0 marks an encrypted entry).
//!
//! Entry names are not part of the record at all; they follow the record
//! table as one run of null-terminated strings, one per entry in record
//! order. The names block is only parseable after the whole record table
//! has been read.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::detect::V3_MAGIC;
use crate::entry::Entry;
use crate::error::{ImgError, Result};
use crate::source::PayloadSource;
use crate::types::SECTOR_SIZE;

pub(crate) const HEADER_SIZE: u64 = 20;
pub(crate) const RECORD_SIZE: u64 = 16;
pub(crate) const V3_VERSION: u32 = 3;

/// Exact byte size lives in bits 11-31 of the packed field.
pub(crate) const SIZE_SHIFT: u32 = 11;
pub(crate) const FLAGS_MASK: u32 = 0x7FF;
pub(crate) const ENCRYPTED_FLAG: u32 = 0x1;

/// Largest entry size the 21-bit packed field can represent.
pub(crate) const MAX_ENTRY_SIZE: u32 = u32::MAX >> SIZE_SHIFT;

pub(crate) fn read_entries(source: &mut dyn PayloadSource) -> Result<Vec<Entry>> {
    if source.len() < HEADER_SIZE {
        return Err(ImgError::TruncatedData {
            expected: HEADER_SIZE,
            actual: source.len(),
        });
    }

    let header = source.read_at(0, HEADER_SIZE as usize)?;
    if LittleEndian::read_u32(&header[0..4]) != V3_MAGIC {
        return Err(ImgError::Format("missing extended-layout magic".into()));
    }
    let version = LittleEndian::read_u32(&header[4..8]);
    if version != V3_VERSION {
        return Err(ImgError::Format(format!(
            "unsupported extended-layout version {version}"
        )));
    }
    let entry_count = LittleEndian::read_u32(&header[8..12]);
    let table_size = LittleEndian::read_u32(&header[12..16]);
    let record_size = u64::from(LittleEndian::read_u32(&header[16..20]));
    if record_size < RECORD_SIZE {
        return Err(ImgError::Format(format!(
            "extended-layout record size {record_size} is smaller than a record"
        )));
    }

    // Pass 1: the fixed records.
    let mut entries = Vec::with_capacity(entry_count as usize);
    for index in 0..u64::from(entry_count) {
        let record_offset = HEADER_SIZE + index * record_size;
        if record_offset + record_size > source.len() {
            warn!(
                "extended directory claims {entry_count} entries but ends at slot {index}, \
                 keeping the partial table"
            );
            break;
        }

        let record = source.read_at(record_offset, RECORD_SIZE as usize)?;
        let meta = LittleEndian::read_u32(&record[0..4]);
        let resource_type = LittleEndian::read_u32(&record[4..8]);
        let offset_sectors = LittleEndian::read_u32(&record[8..12]);
        let packed = LittleEndian::read_u32(&record[12..16]);

        let flags = packed & FLAGS_MASK;
        let mut entry = Entry::stored(
            String::new(),
            u64::from(offset_sectors) * SECTOR_SIZE,
            packed >> SIZE_SHIFT,
        );
        entry.flags = flags;
        entry.encrypted = flags & ENCRYPTED_FLAG != 0;
        entry.resource_meta = meta;
        entry.resource_type = resource_type;
        entries.push(entry);
    }

    // Pass 2: the names block, one null-terminated string per record in
    // table order.
    let parsed = entries.len() as u64;
    let names_start = HEADER_SIZE + parsed * record_size;
    let declared = u64::from(table_size).saturating_sub(parsed * record_size);
    let avail = source.len().saturating_sub(names_start);
    let take = if declared > 0 {
        declared.min(avail)
    } else {
        // Foreign writers that count only records in table_size: scan a
        // bounded window instead.
        avail.min(parsed * 64)
    };

    let block = source.read_at(names_start, take as usize)?;
    let mut cursor = 0usize;
    let mut named = 0usize;
    for entry in &mut entries {
        let Some(nul) = block[cursor..].iter().position(|&b| b == 0) else {
            break;
        };
        entry.name = String::from_utf8_lossy(&block[cursor..cursor + nul]).into_owned();
        cursor += nul + 1;
        named += 1;
    }

    if named < entries.len() {
        warn!(
            "extended names block holds {named} of {} names, dropping unnamed tail",
            entries.len()
        );
        entries.truncate(named);
    } else {
        debug!("extended directory: {} entries", entries.len());
    }

    Ok(entries)
}
