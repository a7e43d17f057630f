//! V1 directory reader (DIR+IMG pair)
//!
//! The sidecar `.dir` file is a flat array of 32-byte records with no header
//! of any kind: `u32 offset_sectors, u32 size_sectors, name[24]`. The data
//! file is headerless; offsets index into it.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::entry::Entry;
use crate::error::Result;
use crate::read::{fixed_name, sectors_to_bytes};
use crate::source::PayloadSource;
use crate::types::SECTOR_SIZE;

const RECORD_SIZE: u64 = 32;

pub(crate) fn read_entries(dir: &mut dyn PayloadSource) -> Result<Vec<Entry>> {
    let count = dir.len() / RECORD_SIZE;
    let mut entries = Vec::with_capacity(count as usize);

    for index in 0..count {
        let record = dir.read_at(index * RECORD_SIZE, RECORD_SIZE as usize)?;
        let offset_sectors = LittleEndian::read_u32(&record[0..4]);
        let size_sectors = LittleEndian::read_u32(&record[4..8]);

        let Some(name) = fixed_name(&record[8..32]) else {
            debug!("V1 directory sentinel at slot {index}, stopping");
            break;
        };

        entries.push(Entry::stored(
            name,
            u64::from(offset_sectors) * SECTOR_SIZE,
            sectors_to_bytes(size_sectors),
        ));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    fn record(offset_sectors: u32, size_sectors: u32, name: &str) -> Vec<u8> {
        let mut rec = Vec::with_capacity(32);
        rec.extend_from_slice(&offset_sectors.to_le_bytes());
        rec.extend_from_slice(&size_sectors.to_le_bytes());
        let mut field = [0u8; 24];
        field[..name.len()].copy_from_slice(name.as_bytes());
        rec.extend_from_slice(&field);
        rec
    }

    #[test]
    fn parses_records_in_order() {
        let mut dir = Vec::new();
        dir.extend(record(0, 2, "first.dff"));
        dir.extend(record(2, 1, "second.txd"));

        let entries = read_entries(&mut SliceSource::new(dir)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name(), "first.dff");
        assert_eq!(entries[0].offset(), 0);
        assert_eq!(entries[0].size(), 4096);
        assert_eq!(entries[1].name(), "second.txd");
        assert_eq!(entries[1].offset(), 4096);
    }

    #[test]
    fn null_name_stops_parsing() {
        let mut dir = Vec::new();
        dir.extend(record(0, 1, "kept.dff"));
        dir.extend(record(1, 1, "")); // unused slot
        dir.extend(record(2, 1, "never_reached.dff"));

        let entries = read_entries(&mut SliceSource::new(dir)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn trailing_partial_record_is_ignored() {
        let mut dir = record(0, 1, "only.dff");
        dir.extend_from_slice(&[0xAA; 10]); // garbage tail, not a full record

        let entries = read_entries(&mut SliceSource::new(dir)).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
