//! IMG archive engine
//!
//! IMG archives are the asset containers used across the 3D-era open-world
//! games and their descendants: a single logical archive holding many named,
//! sector-aligned entries, encoded in one of several mutually incompatible
//! on-disk layouts (a DIR+IMG file pair, the `VER2` single file, the
//! extended table format, and the fastman92 `VERF` variant).
//!
//! This crate detects which layout a file uses, exposes a uniform entry
//! table over it, supports adding/replacing/removing entries, and rebuilds
//! the on-disk representation while preserving byte-exact payloads for
//! everything that was not explicitly changed.
//!
//! The engine is synchronous and performs no internal locking; callers that
//! share an [`Archive`] across threads must serialize access themselves.

pub mod archive;
pub mod detect;
pub mod entry;
pub mod error;
pub mod sniff;
pub mod source;
pub mod types;

mod accessor;
mod read;
mod rebuild;

pub use archive::{Archive, convert_archive};
pub use detect::detect_version;
pub use read::fastman92::VerfHeader;
pub use entry::{Entry, EntryHandle, EntryTable};
pub use error::{ImgError, Result};
pub use sniff::{PayloadInfo, describe_payload};
pub use source::{FileSource, PayloadSource, SliceSource};
pub use types::{Compression, ImgVersion, Platform, Provenance, SECTOR_SIZE, ValidationIssue};
