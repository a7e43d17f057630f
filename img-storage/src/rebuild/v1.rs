//! V1 rebuilder (DIR+IMG pair)
//!
//! Two independent files: the `.dir` sidecar is the flat record array, the
//! `.img` data file is headerless with payloads starting at sector 0.

use std::path::Path;

use crate::entry::Entry;
use crate::error::Result;
use crate::rebuild::{SectorWriter, write_data_region, write_name_field};
use crate::types::SECTOR_SIZE;

pub(crate) fn write(
    dir_path: &Path,
    img_path: &Path,
    entries: &[Entry],
    payloads: &[Vec<u8>],
    offsets: &[u64],
) -> Result<()> {
    let mut directory = Vec::with_capacity(entries.len() * 32);
    for (entry, offset) in entries.iter().zip(offsets) {
        directory.extend_from_slice(&((offset / SECTOR_SIZE) as u32).to_le_bytes());
        directory.extend_from_slice(&(entry.size_sectors() as u32).to_le_bytes());
        write_name_field(&mut directory, entry.name(), 24);
    }

    let mut dir_writer = SectorWriter::create(dir_path)?;
    dir_writer.write(&directory)?;
    dir_writer.finish()?;

    let mut img_writer = SectorWriter::create(img_path)?;
    write_data_region(&mut img_writer, offsets, payloads)?;
    img_writer.finish()
}
