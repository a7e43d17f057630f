//! Entry table: the canonical in-memory representation every layout's
//! reader populates and every mutation acts on.

use crate::error::{ImgError, Result};
use crate::types::{Compression, ImgVersion, Provenance, SECTOR_SIZE, sectors};

/// Positional handle into an [`EntryTable`].
///
/// Identity within a table is positional, never name-based: real archives
/// contain duplicate names and the engine must not collapse them. Handles
/// are invalidated by `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(pub(crate) usize);

impl EntryHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One named, offset/size-addressed payload inside an archive.
///
/// An entry does not own its bytes; they are resolved on demand from the
/// backing file (or from the pending buffer for entries added or replaced
/// since the last rebuild).
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub(crate) name: String,
    pub(crate) offset: u64,
    pub(crate) size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) compression: Compression,
    pub(crate) encrypted: bool,
    pub(crate) provenance: Provenance,
    /// Raw layout flag bits (extended/vendor layouts)
    pub(crate) flags: u32,
    /// Extended-layout record metadata, preserved through rebuild
    pub(crate) resource_meta: u32,
    pub(crate) resource_type: u32,
    /// Bytes supplied by add/replace, authoritative until the next rebuild
    pub(crate) pending: Option<Vec<u8>>,
    /// Decoded bytes retained by an explicit read_cached call
    pub(crate) cached: Option<Vec<u8>>,
}

impl Entry {
    /// Entry parsed from an on-disk directory record.
    pub(crate) fn stored(name: String, offset: u64, size: u32) -> Self {
        Self {
            name,
            offset,
            size,
            ..Self::default()
        }
    }

    /// Entry holding caller-supplied bytes, not yet written anywhere.
    pub(crate) fn pending(name: String, data: Vec<u8>, provenance: Provenance) -> Self {
        Self {
            name,
            size: data.len() as u32,
            provenance,
            pending: Some(data),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-cased extension derived from the name, empty if there is none.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_uppercase(),
            None => String::new(),
        }
    }

    /// Byte offset into the backing data. Only authoritative after a
    /// successful open or rebuild; always a sector multiple then.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Stored (possibly compressed) byte length.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decompressed length; meaningful only when the entry is compressed.
    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Extended-layout resource type, zero elsewhere.
    pub fn resource_type(&self) -> u32 {
        self.resource_type
    }

    /// Stored size in sectors, rounded up.
    pub fn size_sectors(&self) -> u64 {
        sectors(u64::from(self.size))
    }

    /// Stored size padded to the sector boundary.
    pub fn padded_size(&self) -> u64 {
        self.size_sectors() * SECTOR_SIZE
    }
}

/// Validate a candidate entry name against a layout's rules.
///
/// The bound is a hard on-disk invariant, not a UI nicety: names live in
/// fixed-width directory fields where a null byte terminates the slot and an
/// all-null field marks the end of the table, so control bytes are reserved.
pub(crate) fn validate_name(name: &str, layout: ImgVersion) -> Result<()> {
    if name.is_empty() {
        return Err(ImgError::Validation("entry name is empty".into()));
    }

    let limit = layout.name_limit();
    if name.len() > limit {
        return Err(ImgError::Validation(format!(
            "entry name '{name}' is {} characters, {layout} allows {limit}",
            name.len()
        )));
    }

    if let Some(bad) = name.bytes().find(|&b| b < 0x20 || b >= 0x7F) {
        return Err(ImgError::Validation(format!(
            "entry name contains reserved byte {bad:#04x}"
        )));
    }

    Ok(())
}

/// Ordered entry list. Order is the on-disk directory order and is
/// semantically significant: rebuild assigns offsets in table order.
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: Vec<Entry>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&Entry> {
        self.entries.get(handle.0)
    }

    pub(crate) fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut Entry> {
        self.entries.get_mut(handle.0)
    }

    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    pub(crate) fn push(&mut self, entry: Entry) -> EntryHandle {
        self.entries.push(entry);
        EntryHandle(self.entries.len() - 1)
    }

    pub(crate) fn remove(&mut self, handle: EntryHandle) -> Option<Entry> {
        if handle.0 < self.entries.len() {
            Some(self.entries.remove(handle.0))
        } else {
            None
        }
    }

    pub fn handles(&self) -> impl Iterator<Item = EntryHandle> + '_ {
        (0..self.entries.len()).map(EntryHandle)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_derived_and_uppercased() {
        let entry = Entry::stored("bistro.dff".into(), 0, 100);
        assert_eq!(entry.extension(), "DFF");

        let no_ext = Entry::stored("readme".into(), 0, 1);
        assert_eq!(no_ext.extension(), "");
    }

    #[test]
    fn padded_size_rounds_to_sectors() {
        let entry = Entry::stored("a.txt".into(), 0, 5);
        assert_eq!(entry.size_sectors(), 1);
        assert_eq!(entry.padded_size(), 2048);
    }

    #[test]
    fn name_validation_per_layout() {
        assert!(validate_name("model.dff", ImgVersion::V2).is_ok());
        assert!(validate_name("", ImgVersion::V2).is_err());
        // 24 chars: fine for fastman92, one over for V2
        let name = "abcdefghijklmnopqrst.dff";
        assert_eq!(name.len(), 24);
        assert!(validate_name(name, ImgVersion::Fastman92).is_ok());
        assert!(validate_name(name, ImgVersion::V2).is_err());
        // Control bytes are directory sentinels
        assert!(validate_name("bad\u{0}name", ImgVersion::V2).is_err());
        assert!(validate_name("bad\tname", ImgVersion::V2).is_err());
    }

    #[test]
    fn duplicate_names_are_kept() {
        let mut table = EntryTable::new();
        table.push(Entry::stored("dup.dff".into(), 0, 1));
        table.push(Entry::stored("dup.dff".into(), 2048, 1));
        assert_eq!(table.len(), 2);
    }
}
