//! Payload byte sources with memory mapping support
//!
//! Everything the data accessor reads from goes through the [`PayloadSource`]
//! capability, resolved at construction time. File handles are scoped to one
//! source instance; the engine opens a source per operation and drops it.

use crate::error::{ImgError, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Anything an entry's bytes can be resolved from.
pub trait PayloadSource {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly `length` bytes at `offset`. Reads past the end are an
    /// error; callers that tolerate short sources check `len()` first.
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>>;
}

/// File-backed source, memory-mapped when possible.
pub struct FileSource {
    /// Memory-mapped file (if available)
    mmap: Option<Mmap>,
    /// Regular file reader (fallback)
    file: Option<BufReader<File>>,
    size: u64,
}

// Mapping limit; larger files fall back to seek+read.
const MMAP_LIMIT: u64 = 2_147_483_648;

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let mmap = if size > 0 && size < MMAP_LIMIT {
            match unsafe { MmapOptions::new().map(&file) } {
                Ok(mmap) => Some(mmap),
                Err(e) => {
                    debug!("memory-mapping {path:?} failed, using file reader: {e}");
                    None
                }
            }
        } else {
            None
        };

        let file = if mmap.is_none() {
            Some(BufReader::new(file))
        } else {
            None
        };

        Ok(Self { mmap, file, size })
    }
}

impl PayloadSource for FileSource {
    fn len(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        if offset + length as u64 > self.size {
            return Err(ImgError::TruncatedData {
                expected: offset + length as u64,
                actual: self.size,
            });
        }

        if let Some(ref mmap) = self.mmap {
            let start = offset as usize;
            Ok(mmap[start..start + length].to_vec())
        } else if let Some(ref mut file) = self.file {
            file.seek(SeekFrom::Start(offset))?;
            let mut buffer = vec![0u8; length];
            file.read_exact(&mut buffer)?;
            Ok(buffer)
        } else {
            // Unreachable by construction; zero-length source
            Ok(Vec::new())
        }
    }
}

/// In-memory source, mainly for callers that already hold archive bytes.
pub struct SliceSource {
    data: Vec<u8>,
}

impl SliceSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl PayloadSource for SliceSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let end = offset + length as u64;
        if end > self.data.len() as u64 {
            return Err(ImgError::TruncatedData {
                expected: end,
                actual: self.data.len() as u64,
            });
        }
        Ok(self.data[offset as usize..end as usize].to_vec())
    }
}
