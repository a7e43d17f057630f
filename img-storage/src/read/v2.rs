//! V2 reader (single file, `VER2` header)
//!
//! 8-byte header `b"VER2", u32 entry_count`, then 32-byte records:
//! `u32 offset_sectors, u16 archive_size_sectors, u16 streaming_size_sectors,
//! name[24]`. Some writers fill only one of the two size fields; the archive
//! size wins when both are present.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::detect::V2_MAGIC;
use crate::entry::Entry;
use crate::error::{ImgError, Result};
use crate::read::{fixed_name, sectors_to_bytes};
use crate::source::PayloadSource;
use crate::types::SECTOR_SIZE;

const HEADER_SIZE: u64 = 8;
const RECORD_SIZE: u64 = 32;

pub(crate) fn read_entries(source: &mut dyn PayloadSource) -> Result<Vec<Entry>> {
    if source.len() < HEADER_SIZE {
        return Err(ImgError::TruncatedData {
            expected: HEADER_SIZE,
            actual: source.len(),
        });
    }

    let header = source.read_at(0, HEADER_SIZE as usize)?;
    if header[..4] != V2_MAGIC {
        return Err(ImgError::Format("missing VER2 signature".into()));
    }
    let entry_count = LittleEndian::read_u32(&header[4..8]);

    let mut entries = Vec::with_capacity(entry_count as usize);
    for index in 0..u64::from(entry_count) {
        let record_offset = HEADER_SIZE + index * RECORD_SIZE;
        if record_offset + RECORD_SIZE > source.len() {
            warn!(
                "VER2 directory claims {entry_count} entries but ends at slot {index}, \
                 keeping the partial table"
            );
            break;
        }

        let record = source.read_at(record_offset, RECORD_SIZE as usize)?;
        let offset_sectors = LittleEndian::read_u32(&record[0..4]);
        let archive_sectors = LittleEndian::read_u16(&record[4..6]);
        let streaming_sectors = LittleEndian::read_u16(&record[6..8]);

        let Some(name) = fixed_name(&record[8..32]) else {
            debug!("VER2 directory sentinel at slot {index}, stopping");
            break;
        };

        let size_sectors = if archive_sectors != 0 {
            archive_sectors
        } else {
            streaming_sectors
        };

        entries.push(Entry::stored(
            name,
            u64::from(offset_sectors) * SECTOR_SIZE,
            sectors_to_bytes(u32::from(size_sectors)),
        ));
    }

    Ok(entries)
}
