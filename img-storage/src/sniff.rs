//! Thin payload header sniff
//!
//! Entries are opaque bytes to the engine; the one concession is a short
//! header peek that yields a human-readable type/version string for
//! display. RenderWare stream files carry a 12-byte section header whose
//! third word encodes the library version; collision files carry a fourcc.

use byteorder::{ByteOrder, LittleEndian};

/// RenderWare clump section (a model / DFF file).
const RW_CLUMP: u32 = 0x10;
/// RenderWare texture dictionary section (a TXD file).
const RW_TEXDICT: u32 = 0x16;

/// Human-readable payload classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadInfo {
    /// What the payload is, e.g. "model"
    pub kind: &'static str,
    /// Format version string, e.g. "RW 3.6.0.3"
    pub version: String,
}

/// Sniff the first bytes of a payload. Returns `None` for anything the
/// engine does not recognize — payload bytes stay opaque beyond this peek.
pub fn describe_payload(data: &[u8]) -> Option<PayloadInfo> {
    if data.len() >= 4 {
        let kind = match &data[..4] {
            b"COLL" => Some("COL1"),
            b"COL\x02" => Some("COL2"),
            b"COL\x03" => Some("COL3"),
            b"COL\x04" => Some("COL4"),
            _ => None,
        };
        if let Some(version) = kind {
            return Some(PayloadInfo {
                kind: "collision",
                version: version.to_string(),
            });
        }

        if &data[..4] == b"ANPK" || &data[..4] == b"ANP3" {
            return Some(PayloadInfo {
                kind: "animation",
                version: String::from_utf8_lossy(&data[..4]).into_owned(),
            });
        }
    }

    if data.len() >= 12 {
        let section = LittleEndian::read_u32(&data[0..4]);
        let library = LittleEndian::read_u32(&data[8..12]);

        let kind = match section {
            RW_CLUMP => Some("model"),
            RW_TEXDICT => Some("texture dictionary"),
            _ => None,
        };
        if let Some(kind) = kind {
            return Some(PayloadInfo {
                kind,
                version: rw_version_name(library),
            });
        }
    }

    None
}

/// Map a RenderWare library id to its release name, falling back to the
/// raw value for ids outside the table.
fn rw_version_name(library: u32) -> String {
    let known = match library {
        0x0800FFFF => "3.0.0.0",
        0x1003FFFF => "3.1.0.1",
        0x1005FFFF => "3.2.0.0",
        0x1400FFFF => "3.4.0.3",
        0x1803FFFF => "3.6.0.3",
        0x1C020037 => "3.7.0.2",
        _ => return format!("RW {library:#010x}"),
    };
    format!("RW {known}")
}
