//! Archive façade: open, mutate, rebuild
//!
//! One `Archive` instance per open file. Every operation runs to completion
//! on the calling thread and may block on file I/O; long opens and rebuilds
//! belong on a caller-owned worker thread. Concurrent mutation of one
//! instance is not supported — callers serialize access themselves.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::accessor;
use crate::detect::{V3_MAGIC, data_path_for, detect_version, directory_path_for};
use crate::entry::{Entry, EntryHandle, EntryTable, validate_name};
use crate::error::{ImgError, Result};
use crate::read::fastman92::VerfHeader;
use crate::read::{fastman92, v1, v2, v3};
use crate::rebuild::{self, assign_offsets};
use crate::sniff::{PayloadInfo, describe_payload};
use crate::source::FileSource;
use crate::types::{
    ImgVersion, Platform, Provenance, SECTOR_SIZE, ValidationIssue, sector_round_up,
};

/// A single logical archive: one or two physical files holding many named
/// entries.
pub struct Archive {
    layout: ImgVersion,
    platform: Platform,
    /// The data file (for V1 this is the `.img` half of the pair)
    primary_path: PathBuf,
    /// The `.dir` half of a V1 pair
    sidecar_path: Option<PathBuf>,
    entries: EntryTable,
    dirty: bool,
    verf: Option<VerfHeader>,
}

impl Archive {
    /// Open an archive, detecting its layout from the file itself.
    ///
    /// Files that are not archives fail with [`ImgError::Format`]; a
    /// truncated directory yields the partial table the reader salvaged.
    pub fn open(path: &Path) -> Result<Self> {
        let layout = detect_version(path)?;
        debug!("opening {path:?} as {layout}");

        let mut verf = None;
        let (primary_path, sidecar_path, entries) = match layout {
            ImgVersion::Unknown => {
                return Err(ImgError::Format(format!(
                    "{} is not a recognized archive",
                    path.display()
                )));
            }
            ImgVersion::V1 => {
                let data = data_path_for(path);
                let directory = directory_path_for(path);
                let mut source = FileSource::open(&directory)?;
                let entries = v1::read_entries(&mut source)?;
                (data, Some(directory), entries)
            }
            ImgVersion::V2 => {
                let mut source = FileSource::open(path)?;
                (path.to_path_buf(), None, v2::read_entries(&mut source)?)
            }
            ImgVersion::V3 => {
                let mut source = FileSource::open(path)?;
                (path.to_path_buf(), None, v3::read_entries(&mut source)?)
            }
            ImgVersion::Fastman92 => {
                let mut source = FileSource::open(path)?;
                let (header, entries) = fastman92::read_entries(&mut source)?;
                verf = Some(header);
                (path.to_path_buf(), None, entries)
            }
        };

        info!(
            "opened {layout} archive {primary_path:?} with {} entries",
            entries.len()
        );

        Ok(Self {
            layout,
            platform: Platform::from_path(path),
            primary_path,
            sidecar_path,
            entries: EntryTable::from_entries(entries),
            dirty: false,
            verf,
        })
    }

    /// Create a new empty archive on disk and return it opened.
    ///
    /// Only layouts with a rebuild path can be created; fastman92 archives
    /// cannot be written at all.
    pub fn create(path: &Path, layout: ImgVersion) -> Result<Self> {
        let (primary_path, sidecar_path) = match layout {
            ImgVersion::V1 => {
                let data = data_path_for(path);
                let directory = directory_path_for(path);
                File::create(&directory)?;
                File::create(&data)?;
                (data, Some(directory))
            }
            ImgVersion::V2 => {
                let mut file = File::create(path)?;
                file.write_all(b"VER2")?;
                file.write_all(&0u32.to_le_bytes())?;
                (path.to_path_buf(), None)
            }
            ImgVersion::V3 => {
                let mut file = File::create(path)?;
                file.write_all(&V3_MAGIC.to_le_bytes())?;
                file.write_all(&3u32.to_le_bytes())?;
                file.write_all(&0u32.to_le_bytes())?; // entry count
                file.write_all(&0u32.to_le_bytes())?; // table size
                file.write_all(&16u32.to_le_bytes())?; // record size
                (path.to_path_buf(), None)
            }
            ImgVersion::Fastman92 | ImgVersion::Unknown => {
                return Err(ImgError::UnsupportedLayoutOperation(
                    "creating archives with this layout",
                ));
            }
        };

        info!("created empty {layout} archive at {primary_path:?}");

        Ok(Self {
            layout,
            platform: Platform::from_path(path),
            primary_path,
            sidecar_path,
            entries: EntryTable::new(),
            dirty: false,
            verf: None,
        })
    }

    pub fn layout(&self) -> ImgVersion {
        self.layout
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary_path
    }

    pub fn sidecar_path(&self) -> Option<&Path> {
        self.sidecar_path.as_deref()
    }

    /// The `VERF` preamble, present on fastman92 archives only.
    pub fn vendor_header(&self) -> Option<&VerfHeader> {
        self.verf.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Entries in on-disk directory order.
    pub fn entries(&self) -> &[Entry] {
        self.entries.as_slice()
    }

    pub fn entry(&self, handle: EntryHandle) -> Option<&Entry> {
        self.entries.get(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = EntryHandle> + '_ {
        self.entries.handles()
    }

    /// First entry whose name matches, case-insensitively.
    ///
    /// Duplicate names are legal; this returns the earliest slot and never
    /// collapses the rest.
    pub fn find_entry(&self, name: &str) -> Option<EntryHandle> {
        self.entries
            .iter()
            .position(|e| e.name().eq_ignore_ascii_case(name))
            .map(EntryHandle)
    }

    pub fn entries_with_extension(&self, extension: &str) -> Vec<EntryHandle> {
        let wanted = extension.trim_start_matches('.').to_ascii_uppercase();
        self.entries
            .handles()
            .filter(|&h| self.entries.get(h).is_some_and(|e| e.extension() == wanted))
            .collect()
    }

    /// An entry's logical bytes, decompressed when the directory says so.
    pub fn read(&self, handle: EntryHandle) -> Result<Vec<u8>> {
        let entry = self.entries.get(handle).ok_or(ImgError::NotFound(handle.0))?;
        accessor::read_decoded(&self.primary_path, entry)
    }

    /// An entry's stored bytes exactly as they sit on disk.
    pub fn read_raw(&self, handle: EntryHandle) -> Result<Vec<u8>> {
        let entry = self.entries.get(handle).ok_or(ImgError::NotFound(handle.0))?;
        accessor::read_stored(&self.primary_path, entry)
    }

    /// Like [`read`](Self::read), but retains the decoded bytes on the
    /// entry for subsequent calls. Decoded bytes are cached only through
    /// this explicit request; mutation drops the cache.
    pub fn read_cached(&mut self, handle: EntryHandle) -> Result<&[u8]> {
        let entry = self.entries.get(handle).ok_or(ImgError::NotFound(handle.0))?;
        if entry.cached.is_none() {
            let decoded = accessor::read_decoded(&self.primary_path, entry)?;
            if let Some(entry) = self.entries.get_mut(handle) {
                entry.cached = Some(decoded);
            }
        }
        let entry = self.entries.get(handle).ok_or(ImgError::NotFound(handle.0))?;
        Ok(entry.cached.as_deref().unwrap_or_default())
    }

    /// Sniff an entry's payload for a human-readable type/version string.
    pub fn describe_entry(&self, handle: EntryHandle) -> Result<Option<PayloadInfo>> {
        Ok(describe_payload(&self.read(handle)?))
    }

    /// Append a new entry holding `data`.
    ///
    /// The name is validated against this layout's bound before anything is
    /// touched; a rejected add leaves the table exactly as it was. The new
    /// entry has no authoritative offset until the next rebuild.
    pub fn add(&mut self, name: &str, data: Vec<u8>) -> Result<EntryHandle> {
        validate_name(name, self.layout)?;
        check_entry_size(data.len())?;

        let handle = self
            .entries
            .push(Entry::pending(name.to_string(), data, Provenance::New));
        self.dirty = true;
        debug!("added entry '{name}' at slot {}", handle.0);
        Ok(handle)
    }

    /// Overwrite an entry's bytes in place, keeping its name and position.
    ///
    /// The backing file is untouched until rebuild.
    pub fn replace(&mut self, handle: EntryHandle, data: Vec<u8>) -> Result<()> {
        check_entry_size(data.len())?;
        let entry = self
            .entries
            .get_mut(handle)
            .ok_or(ImgError::NotFound(handle.0))?;

        entry.size = data.len() as u32;
        entry.uncompressed_size = 0;
        entry.compression = crate::types::Compression::None;
        entry.encrypted = false;
        entry.provenance = Provenance::Replaced;
        entry.pending = Some(data);
        entry.cached = None;
        self.dirty = true;
        Ok(())
    }

    /// Remove an entry from the table. The backing file is not compacted
    /// until rebuild; the relative order of all other entries is kept.
    pub fn remove(&mut self, handle: EntryHandle) -> Result<()> {
        let entry = self
            .entries
            .remove(handle)
            .ok_or(ImgError::NotFound(handle.0))?;
        self.dirty = true;
        debug!("removed entry '{}'", entry.name());
        Ok(())
    }

    /// Regenerate the on-disk representation from the current table.
    ///
    /// Writes to `target` when given, otherwise over the archive's own
    /// path(s). On success the live entries carry the offsets that were
    /// written and the dirty flag clears.
    pub fn rebuild(&mut self, target: Option<&Path>) -> Result<()> {
        match self.layout {
            ImgVersion::Unknown => {
                return Err(ImgError::Format("archive has no usable layout".into()));
            }
            ImgVersion::Fastman92 => {
                return Err(ImgError::UnsupportedLayoutOperation(
                    "rebuilding fastman92 archives",
                ));
            }
            ImgVersion::V3 if self.entries.iter().any(Entry::is_encrypted) => {
                return Err(ImgError::UnsupportedLayoutOperation(
                    "rebuilding encrypted extended archives",
                ));
            }
            _ => {}
        }

        // Drain every payload through the accessor first; the target may be
        // the file we are reading from.
        let payloads: Vec<Vec<u8>> = self
            .entries
            .iter()
            .map(|entry| accessor::read_stored(&self.primary_path, entry))
            .collect::<Result<_>>()?;

        let primary_target = target.map_or_else(|| self.primary_path.clone(), data_path_for);
        let entries = self.entries.as_slice();

        let (offsets, sidecar_target) = match self.layout {
            ImgVersion::V1 => {
                let offsets = assign_offsets(entries, 0);
                let directory = directory_path_for(&primary_target);
                rebuild::v1::write(&directory, &primary_target, entries, &payloads, &offsets)?;
                (offsets, Some(directory))
            }
            ImgVersion::V2 => {
                let data_start = sector_round_up(rebuild::v2::directory_size(entries.len()));
                let offsets = assign_offsets(entries, data_start);
                rebuild::v2::write(&primary_target, entries, &payloads, &offsets, data_start)?;
                (offsets, None)
            }
            ImgVersion::V3 => {
                let data_start = sector_round_up(rebuild::v3::directory_size(entries));
                let offsets = assign_offsets(entries, data_start);
                rebuild::v3::write(&primary_target, entries, &payloads, &offsets, data_start)?;
                (offsets, None)
            }
            ImgVersion::Fastman92 | ImgVersion::Unknown => unreachable!(),
        };

        for (entry, offset) in self.entries.as_mut_slice().iter_mut().zip(&offsets) {
            entry.offset = *offset;
            entry.pending = None;
        }
        self.primary_path = primary_target;
        self.sidecar_path = sidecar_target;
        self.dirty = false;

        info!(
            "rebuilt {} archive {:?} with {} entries",
            self.layout,
            self.primary_path,
            self.entries.len()
        );
        Ok(())
    }

    /// Audit the table for structural problems: misaligned offsets,
    /// overlapping extents, extents past the backing file, name issues.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let limit = self.layout.name_limit();

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.name().is_empty() {
                issues.push(ValidationIssue {
                    entry: Some(index),
                    message: "empty name".into(),
                });
            } else if entry.name().len() > limit {
                issues.push(ValidationIssue {
                    entry: Some(index),
                    message: format!(
                        "name is {} characters, layout allows {limit}",
                        entry.name().len()
                    ),
                });
            }

            // Entries with pending bytes have no authoritative offset yet.
            if entry.pending.is_none() && entry.offset % SECTOR_SIZE != 0 {
                issues.push(ValidationIssue {
                    entry: Some(index),
                    message: format!("offset {} is not sector-aligned", entry.offset),
                });
            }
        }

        // Overlap check over stored extents, in offset order.
        let mut extents: Vec<(usize, u64, u64)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.pending.is_none() && e.size > 0)
            .map(|(i, e)| (i, e.offset, e.offset + e.padded_size()))
            .collect();
        extents.sort_by_key(|&(_, start, _)| start);
        for pair in extents.windows(2) {
            let (_, _, end) = pair[0];
            let (index, start, _) = pair[1];
            if start < end {
                issues.push(ValidationIssue {
                    entry: Some(index),
                    message: format!("extent starting at {start} overlaps the previous entry"),
                });
            }
        }

        match std::fs::metadata(&self.primary_path) {
            Ok(meta) => {
                let len = meta.len();
                for (index, entry) in self.entries.iter().enumerate() {
                    if entry.pending.is_none() && entry.offset + u64::from(entry.size) > len {
                        issues.push(ValidationIssue {
                            entry: Some(index),
                            message: format!(
                                "extent ends at {} but the data file is {len} bytes",
                                entry.offset + u64::from(entry.size)
                            ),
                        });
                    }
                }
            }
            Err(e) => issues.push(ValidationIssue {
                entry: None,
                message: format!("data file unreadable: {e}"),
            }),
        }

        issues
    }
}

fn check_entry_size(len: usize) -> Result<()> {
    if u32::try_from(len).is_err() {
        return Err(ImgError::Validation(format!(
            "payload of {len} bytes exceeds the 32-bit entry size field"
        )));
    }
    Ok(())
}

/// Copy every entry of `source` into a fresh archive of `layout` at
/// `target` and rebuild it.
///
/// Payloads are copied decoded, so a compressed vendor archive converts
/// into plain stored entries. Names that exceed the target layout's bound
/// fail the conversion.
pub fn convert_archive(source: &Path, target: &Path, layout: ImgVersion) -> Result<()> {
    let from = Archive::open(source)?;
    let mut to = Archive::create(target, layout)?;

    for handle in from.handles() {
        let entry = from.entry(handle).ok_or(ImgError::NotFound(handle.index()))?;
        let data = from.read(handle)?;
        to.add(entry.name(), data)?;
    }

    to.rebuild(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Compression;

    fn empty_v2(dir: &tempfile::TempDir) -> Archive {
        Archive::create(&dir.path().join("test.img"), ImgVersion::V2).unwrap()
    }

    #[test]
    fn add_appends_with_new_provenance() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);

        assert!(!archive.is_dirty());
        let handle = archive.add("hello.dff", b"payload".to_vec()).unwrap();
        assert!(archive.is_dirty());
        assert_eq!(archive.len(), 1);

        let entry = archive.entry(handle).unwrap();
        assert_eq!(entry.provenance(), Provenance::New);
        assert_eq!(entry.size(), 7);
        assert_eq!(archive.read(handle).unwrap(), b"payload");
    }

    #[test]
    fn rejected_add_leaves_table_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);

        let long = "much_too_long_for_this_layout.dff";
        let err = archive.add(long, vec![0]).unwrap_err();
        assert!(matches!(err, ImgError::Validation(_)));
        assert_eq!(archive.len(), 0);
        assert!(!archive.is_dirty());
    }

    #[test]
    fn replace_keeps_name_and_position() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);
        archive.add("first.dff", vec![1]).unwrap();
        let second = archive.add("second.dff", vec![2]).unwrap();
        archive.add("third.dff", vec![3]).unwrap();

        archive.replace(second, b"bigger payload".to_vec()).unwrap();

        let entry = archive.entry(second).unwrap();
        assert_eq!(entry.name(), "second.dff");
        assert_eq!(entry.provenance(), Provenance::Replaced);
        assert_eq!(entry.size(), 14);
        assert_eq!(archive.entries()[1].name(), "second.dff");
        assert_eq!(archive.read(second).unwrap(), b"bigger payload");
    }

    #[test]
    fn remove_preserves_relative_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);
        archive.add("a.dff", vec![1]).unwrap();
        let b = archive.add("b.dff", vec![2]).unwrap();
        archive.add("c.dff", vec![3]).unwrap();

        archive.remove(b).unwrap();

        let names: Vec<&str> = archive.entries().iter().map(Entry::name).collect();
        assert_eq!(names, vec!["a.dff", "c.dff"]);

        let err = archive.remove(EntryHandle(5)).unwrap_err();
        assert!(matches!(err, ImgError::NotFound(5)));
    }

    #[test]
    fn find_entry_is_case_insensitive_and_positional() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);
        archive.add("dup.dff", vec![1]).unwrap();
        archive.add("DUP.DFF", vec![2]).unwrap();

        let found = archive.find_entry("Dup.Dff").unwrap();
        assert_eq!(found.index(), 0);
        assert_eq!(archive.len(), 2); // duplicates stay
    }

    #[test]
    fn entries_with_extension_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);
        archive.add("a.dff", vec![1]).unwrap();
        archive.add("b.txd", vec![2]).unwrap();
        archive.add("c.dff", vec![3]).unwrap();

        let models = archive.entries_with_extension("dff");
        assert_eq!(models.len(), 2);
    }

    #[test]
    fn read_cached_retains_decoded_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);
        let handle = archive.add("a.dff", b"cache me".to_vec()).unwrap();

        assert!(archive.entry(handle).unwrap().cached.is_none());
        assert_eq!(archive.read_cached(handle).unwrap(), b"cache me");
        assert!(archive.entry(handle).unwrap().cached.is_some());

        // Replace drops the stale cache.
        archive.replace(handle, b"other".to_vec()).unwrap();
        assert!(archive.entry(handle).unwrap().cached.is_none());
    }

    #[test]
    fn fastman92_rebuild_is_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("verf.img");
        let mut data = Vec::new();
        data.extend_from_slice(b"VERF");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        std::fs::write(&path, data).unwrap();

        let mut archive = Archive::open(&path).unwrap();
        assert_eq!(archive.layout(), ImgVersion::Fastman92);
        assert!(archive.vendor_header().is_some());

        let err = archive.rebuild(None).unwrap_err();
        assert!(matches!(err, ImgError::UnsupportedLayoutOperation(_)));
    }

    #[test]
    fn replacing_clears_compression_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let mut archive = empty_v2(&tmp);
        let handle = archive.add("x.dff", vec![0]).unwrap();

        archive.replace(handle, vec![1, 2, 3]).unwrap();
        assert_eq!(archive.entry(handle).unwrap().compression(), Compression::None);
        assert_eq!(archive.entry(handle).unwrap().uncompressed_size(), 0);
    }
}
