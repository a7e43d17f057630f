//! fastman92 frame header
//!
//! The fastman92 archive variant does not store codec output bare: each
//! compressed payload is prefixed with a small fixed header recording the
//! original size, the compressed size and a format version. Adding and
//! stripping the header is the codec's job, not the caller's.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::{Error, Result};

/// Size of the frame header on disk.
pub const FRAME_HEADER_LEN: usize = 12;

/// The only frame version written by known tools.
pub const FRAME_VERSION: u32 = 1;

/// Parsed fastman92 frame header: `u32 original_size, u32 compressed_size,
/// u32 version`, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub original_size: u32,
    pub compressed_size: u32,
    pub version: u32,
}

impl FrameHeader {
    pub fn new(original_size: u32, compressed_size: u32) -> Self {
        Self {
            original_size,
            compressed_size,
            version: FRAME_VERSION,
        }
    }

    /// Parse the header from the front of a framed payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_HEADER_LEN {
            return Err(Error::TruncatedFrame {
                expected: FRAME_HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let original_size = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let version = cursor.read_u32::<LittleEndian>()?;

        Ok(Self {
            original_size,
            compressed_size,
            version,
        })
    }

    /// The codec bytes behind the header.
    ///
    /// Fails if the payload is shorter than `compressed_size`; trailing
    /// sector padding beyond it is ignored.
    pub fn body<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let end = FRAME_HEADER_LEN + self.compressed_size as usize;
        if data.len() < end {
            return Err(Error::TruncatedFrame {
                expected: end,
                actual: data.len(),
            });
        }
        Ok(&data[FRAME_HEADER_LEN..end])
    }

    /// Append the 12 header bytes to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        // Vec<u8> writes cannot fail
        let _ = out.write_u32::<LittleEndian>(self.original_size);
        let _ = out.write_u32::<LittleEndian>(self.compressed_size);
        let _ = out.write_u32::<LittleEndian>(self.version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let header = FrameHeader::new(4096, 1200);
        let mut buf = Vec::new();
        header.write_to(&mut buf);
        assert_eq!(buf.len(), FRAME_HEADER_LEN);

        let parsed = FrameHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.version, FRAME_VERSION);
    }

    #[test]
    fn rejects_short_input() {
        let err = FrameHeader::parse(&[0u8; 7]).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedFrame {
                expected: 12,
                actual: 7
            }
        ));
    }

    #[test]
    fn body_respects_compressed_size() {
        let mut buf = Vec::new();
        FrameHeader::new(100, 4).write_to(&mut buf);
        buf.extend_from_slice(&[1, 2, 3, 4, 0, 0, 0]); // payload + padding

        let header = FrameHeader::parse(&buf).unwrap();
        assert_eq!(header.body(&buf).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn body_rejects_truncated_payload() {
        let mut buf = Vec::new();
        FrameHeader::new(100, 10).write_to(&mut buf);
        buf.extend_from_slice(&[1, 2, 3]);

        let header = FrameHeader::parse(&buf).unwrap();
        assert!(header.body(&buf).is_err());
    }
}
