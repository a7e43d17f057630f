//! Common types used throughout the archive engine

use std::fmt;
use std::path::Path;

use img_codec::Codec;

/// Fixed alignment unit for entry offsets and on-disk sizes.
pub const SECTOR_SIZE: u64 = 2048;

/// Number of sectors needed to hold `len` bytes.
pub fn sectors(len: u64) -> u64 {
    len.div_ceil(SECTOR_SIZE)
}

/// `len` rounded up to the next sector boundary.
pub fn sector_round_up(len: u64) -> u64 {
    sectors(len) * SECTOR_SIZE
}

/// On-disk layout of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImgVersion {
    Unknown,
    /// DIR+IMG file pair (GTA III / Vice City era)
    V1,
    /// Single file with `VER2` header (San Andreas era)
    V2,
    /// Extended table format, optionally encrypted
    V3,
    /// fastman92 `VERF` variant
    Fastman92,
}

impl ImgVersion {
    /// Usable name characters for this layout, excluding the reserved
    /// null terminator of the fixed-width field.
    pub fn name_limit(self) -> usize {
        match self {
            Self::V1 | Self::V2 => 23,
            Self::V3 => 20,
            Self::Fastman92 => 24,
            Self::Unknown => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::V1 => "V1 (DIR+IMG)",
            Self::V2 => "V2 (VER2)",
            Self::V3 => "V3 (extended)",
            Self::Fastman92 => "fastman92 (VERF)",
        }
    }
}

impl fmt::Display for ImgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target platform an archive was built for.
///
/// Orthogonal to [`ImgVersion`]; inferred from path keywords and kept for
/// display. Directory parsing is identical across platforms and everything
/// is little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Pc,
    Ps2,
    Xbox,
    Psp,
    Mobile,
    #[default]
    Unknown,
}

impl Platform {
    /// Guess the platform from path keywords. Defaults to PC, which is what
    /// nearly every archive in the wild turns out to be.
    pub fn from_path(path: &Path) -> Self {
        let lowered = path.to_string_lossy().to_lowercase();

        if ["ps2", "playstation2", "pcsx2"].iter().any(|k| lowered.contains(k)) {
            Self::Ps2
        } else if ["psp", "stories"].iter().any(|k| lowered.contains(k)) {
            Self::Psp
        } else if ["android", "mobile", "ios"].iter().any(|k| lowered.contains(k)) {
            Self::Mobile
        } else if lowered.contains("xbox") {
            Self::Xbox
        } else {
            Self::Pc
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pc => "PC",
            Self::Ps2 => "PS2",
            Self::Xbox => "Xbox",
            Self::Psp => "PSP",
            Self::Mobile => "Mobile",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// How an entry got into the table. Read by callers for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provenance {
    #[default]
    Unmodified,
    New,
    Replaced,
}

/// Per-entry compression tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Stored uncompressed
    #[default]
    None,
    /// A codec this build can decode
    Known(Codec),
    /// Directory declared an algorithm id nobody recognizes; reads fail
    /// loudly instead of returning garbage
    Unknown(u8),
}

impl Compression {
    pub fn is_compressed(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Known(codec) => codec.fmt(f),
            Self::Unknown(id) => write!(f, "unknown ({id:#04x})"),
        }
    }
}

/// One finding from [`crate::Archive::validate`]. Transient value type.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Index of the offending entry, if the issue is entry-scoped
    pub entry: Option<usize>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(index) => write!(f, "entry {index}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
