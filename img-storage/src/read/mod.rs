//! Per-layout directory readers
//!
//! One strategy per on-disk layout. They share no base implementation beyond
//! the entry table they populate: record sizes, field order and sector-unit
//! conventions differ per version. Shared tolerances: an all-null name field
//! is a stop sentinel, and a record count that would run past end-of-file
//! stops early instead of failing — real archives are known to carry sloppy
//! counts.

pub(crate) mod fastman92;
pub(crate) mod v1;
pub(crate) mod v2;
pub(crate) mod v3;

use crate::types::SECTOR_SIZE;

/// Parse a fixed-width null-padded name field.
///
/// Returns `None` for the unused-slot sentinel (nothing before the first
/// null), which ends directory parsing.
pub(crate) fn fixed_name(field: &[u8]) -> Option<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&field[..end]).into_owned())
}

/// Sector count to bytes, saturating at the u32 size field.
pub(crate) fn sectors_to_bytes(sectors: u32) -> u32 {
    u32::try_from(u64::from(sectors) * SECTOR_SIZE).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_name_trims_padding() {
        let mut field = [0u8; 24];
        field[..9].copy_from_slice(b"model.dff");
        assert_eq!(fixed_name(&field).as_deref(), Some("model.dff"));
    }

    #[test]
    fn all_null_field_is_sentinel() {
        assert_eq!(fixed_name(&[0u8; 24]), None);
    }

    #[test]
    fn unterminated_field_uses_full_width() {
        let field = [b'x'; 24];
        assert_eq!(fixed_name(&field).map(|n| n.len()), Some(24));
    }
}
