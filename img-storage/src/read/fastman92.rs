//! fastman92 reader (`VERF` vendor variant)
//!
//! 20-byte preamble `b"VERF", u32 archive_flags, author[12]`, a 12-byte
//! block `u32 check==1, u32 entry_count, u32 reserved`, then 64-byte
//! records: `u32 offset_sectors, u32 uncompressed_sectors,
//! u32 compressed_sectors, u32 entry_flags, name[40], reserved[8]`. The low
//! 4 bits of the entry flags select the compression algorithm id.

use byteorder::{ByteOrder, LittleEndian};
use img_codec::Codec;
use tracing::{debug, warn};

use crate::detect::VERF_MAGIC;
use crate::entry::Entry;
use crate::error::{ImgError, Result};
use crate::read::{fixed_name, sectors_to_bytes};
use crate::source::PayloadSource;
use crate::types::{Compression, SECTOR_SIZE};

pub(crate) const PREAMBLE_SIZE: u64 = 20;
pub(crate) const CHECK_BLOCK_SIZE: u64 = 12;
pub(crate) const RECORD_SIZE: u64 = 64;

/// Parsed `VERF` preamble. The flags word packs three adjacent bit-fields.
#[derive(Debug, Clone, Copy)]
pub struct VerfHeader {
    pub archive_flags: u32,
    pub author: [u8; 12],
}

impl VerfHeader {
    pub fn sub_version(&self) -> u8 {
        (self.archive_flags & 0xFF) as u8
    }

    pub fn encryption_type(&self) -> u8 {
        ((self.archive_flags >> 8) & 0xF) as u8
    }

    pub fn game_id(&self) -> u8 {
        ((self.archive_flags >> 12) & 0xF) as u8
    }

    /// Nonzero encryption type means every payload in the archive is
    /// encrypted with a scheme this engine cannot decode.
    pub fn is_encrypted(&self) -> bool {
        self.encryption_type() != 0
    }
}

pub(crate) fn read_entries(source: &mut dyn PayloadSource) -> Result<(VerfHeader, Vec<Entry>)> {
    let header_end = PREAMBLE_SIZE + CHECK_BLOCK_SIZE;
    if source.len() < header_end {
        return Err(ImgError::TruncatedData {
            expected: header_end,
            actual: source.len(),
        });
    }

    let preamble = source.read_at(0, PREAMBLE_SIZE as usize)?;
    if preamble[..4] != VERF_MAGIC {
        return Err(ImgError::Format("missing VERF signature".into()));
    }
    let archive_flags = LittleEndian::read_u32(&preamble[4..8]);
    let mut author = [0u8; 12];
    author.copy_from_slice(&preamble[8..20]);
    let header = VerfHeader {
        archive_flags,
        author,
    };

    let check_block = source.read_at(PREAMBLE_SIZE, CHECK_BLOCK_SIZE as usize)?;
    let check = LittleEndian::read_u32(&check_block[0..4]);
    if check != 1 {
        return Err(ImgError::Format(format!(
            "VERF check field is {check}, expected 1"
        )));
    }
    let entry_count = LittleEndian::read_u32(&check_block[4..8]);

    debug!(
        "VERF archive: sub-version {}, encryption {}, game {}, {entry_count} entries",
        header.sub_version(),
        header.encryption_type(),
        header.game_id()
    );

    let mut entries = Vec::with_capacity(entry_count as usize);
    for index in 0..u64::from(entry_count) {
        let record_offset = header_end + index * RECORD_SIZE;
        if record_offset + RECORD_SIZE > source.len() {
            warn!(
                "VERF directory claims {entry_count} entries but ends at slot {index}, \
                 keeping the partial table"
            );
            break;
        }

        let record = source.read_at(record_offset, RECORD_SIZE as usize)?;
        let offset_sectors = LittleEndian::read_u32(&record[0..4]);
        let uncompressed_sectors = LittleEndian::read_u32(&record[4..8]);
        let compressed_sectors = LittleEndian::read_u32(&record[8..12]);
        let entry_flags = LittleEndian::read_u32(&record[12..16]);

        let Some(name) = fixed_name(&record[16..56]) else {
            debug!("VERF directory sentinel at slot {index}, stopping");
            break;
        };

        let algorithm_id = (entry_flags & 0xF) as u8;
        let (compression, size, uncompressed_size) = if algorithm_id == 0 {
            (Compression::None, sectors_to_bytes(uncompressed_sectors), 0)
        } else {
            let compression = match Codec::from_vendor_id(algorithm_id) {
                Some(codec) => Compression::Known(codec),
                None => Compression::Unknown(algorithm_id),
            };
            (
                compression,
                sectors_to_bytes(compressed_sectors),
                sectors_to_bytes(uncompressed_sectors),
            )
        };

        let mut entry = Entry::stored(name, u64::from(offset_sectors) * SECTOR_SIZE, size);
        entry.uncompressed_size = uncompressed_size;
        entry.compression = compression;
        entry.encrypted = header.is_encrypted();
        entry.flags = entry_flags;
        entries.push(entry);
    }

    Ok((header, entries))
}
