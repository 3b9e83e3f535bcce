//! Font image accessor (spec §4.1).
//!
//! A font image — whether the read-only source font or a mutable cache
//! image — is a contiguous byte buffer laid out as:
//!
//! ```text
//! [ header | hash table | offset table | glyph region ]
//! ```
//!
//! The exact header/offset-table bit widths are version-dependent (spec §3).
//! Nothing upstream of this module ever indexes the buffer directly; every
//! other module goes through a [`FontImageDescriptor`], which resolves those
//! widths once and exposes bounds-checked reads and writes of the two
//! variable-width fields (codepoint, offset).

use crate::error::Error;
use crate::utils::{u16_from_le_bytes_ref, write_u16_le, write_u32_le};

/// Header length when `version == 1`: `version`(1) + `fontinfo_size`(2) +
/// `glyph_amount`(2).
pub const V1_LENGTH: usize = 5;
/// Header length when `version == 2`: [`V1_LENGTH`] plus `hash_table_size`(1)
/// + `codepoint_bytes`(1) + `features`(1).
pub const V2_LENGTH: usize = 8;
/// Width of a fixed glyph header: `width`, `height`, `left_bearing`,
/// `top_bearing`, `horiz_advance`, all byte-sized — matching the layout of
/// Pebble's `GGlyphInfo`.
pub const GLYPH_INFO_SIZE: usize = 5;
/// Byte width of one hash-table entry: `offset_table_offset`(2) +
/// `offset_table_size`(2).
pub const HASH_TABLE_ENTRY_SIZE: usize = 4;
/// Bucket count for version-1 fonts.
pub const V1_HASH_TABLE_SIZE: usize = 255;
/// Byte width reserved ahead of every glyph record for its access timestamp.
pub const TIMESTAMP_SIZE: usize = 4;
/// Per-entry glyph capacity of a cache image (spec §6 configuration).
pub const CACHE_COUNT: usize = 22;

/// Sentinel offset value meaning "glyph not present".
pub const OFFSET_ABSENT: u32 = 0xFFFF;
/// Sentinel offset value meaning "served by the resident tofu glyph".
pub const OFFSET_TOFU_ALIAS: u32 = 4;
/// Byte position of the tofu glyph's header, relative to the glyph region.
pub const TOFU_RELATIVE_OFFSET: u32 = OFFSET_TOFU_ALIAS;

/// Feature bit indicating 2-byte (rather than 4-byte) offset-table offset
/// fields. Only meaningful for `version >= 2`.
const FEATURE_2BYTE_OFFSET: u8 = 1 << 0;

/// A parsed, bounds-resolved view over a font image's fixed layout.
///
/// Holds only offsets and widths — never a copy of the data — so the same
/// descriptor is recomputed cheaply every time a buffer changes size (growth
/// during insertion invalidates any previous descriptor's buffer pointer,
/// not its offsets, since the prefix never moves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontImageDescriptor {
    pub version: u8,
    pub glyph_amount: u16,
    pub hash_table_size: u16,
    pub codepoint_bytes: u8,
    pub offset_field_bytes: u8,
    pub offset_entry_size: u8,
    pub header_size: usize,
    pub hash_table_offset: usize,
    pub offset_table_offset: usize,
    pub glyph_region_offset: usize,
}

fn checked_slice(buf: &[u8], start: usize, len: usize) -> Result<&[u8], Error> {
    buf.get(start..start + len).ok_or(Error::MalformedFont)
}

impl FontImageDescriptor {
    /// Derive a descriptor by parsing `buf`'s header, hash table size and
    /// offset-table field widths (spec §4.1).
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        if buf.is_empty() {
            return Err(Error::MalformedFont);
        }
        let version = buf[0];

        let (header_size, hash_table_size, codepoint_bytes, offset_field_bytes) = match version {
            1 => (V1_LENGTH, V1_HASH_TABLE_SIZE as u16, 4u8, 4u8),
            2 => {
                let fixed = checked_slice(buf, 0, V2_LENGTH)?;
                let hash_table_size = fixed[5] as u16;
                let codepoint_bytes = fixed[6];
                let features = fixed[7];
                let offset_field_bytes = if features & FEATURE_2BYTE_OFFSET != 0 {
                    2
                } else {
                    4
                };
                (V2_LENGTH, hash_table_size, codepoint_bytes, offset_field_bytes)
            }
            _ => {
                let fontinfo_size = u16_from_le_bytes_ref(checked_slice(buf, 1, 2)?) as usize;
                // Forward-compatible fallback: read the common prefix fields
                // the same way a v2 font would, trusting the stored header
                // size for where the hash table actually starts.
                let hash_table_size = checked_slice(buf, 5, 1).map(|s| s[0] as u16).unwrap_or(0);
                let codepoint_bytes = checked_slice(buf, 6, 1).map(|s| s[0]).unwrap_or(4);
                let features = checked_slice(buf, 7, 1).map(|s| s[0]).unwrap_or(0);
                let offset_field_bytes = if features & FEATURE_2BYTE_OFFSET != 0 {
                    2
                } else {
                    4
                };
                (fontinfo_size, hash_table_size, codepoint_bytes, offset_field_bytes)
            }
        };

        let glyph_amount = u16_from_le_bytes_ref(checked_slice(buf, 3, 2)?);
        let offset_entry_size = codepoint_bytes + offset_field_bytes;

        let hash_table_offset = header_size;
        let offset_table_offset =
            hash_table_offset + (hash_table_size as usize) * HASH_TABLE_ENTRY_SIZE;
        let glyph_region_offset =
            offset_table_offset + (glyph_amount as usize) * (offset_entry_size as usize);

        // Validate the computed layout actually fits in the buffer; callers
        // that only need the glyph-region start (e.g. to read the tofu
        // header) still get a useful bounds check here.
        if buf.len() < glyph_region_offset {
            return Err(Error::MalformedFont);
        }

        Ok(Self {
            version,
            glyph_amount,
            hash_table_size,
            codepoint_bytes,
            offset_field_bytes,
            offset_entry_size,
            header_size,
            hash_table_offset,
            offset_table_offset,
            glyph_region_offset,
        })
    }

    #[inline]
    pub fn offset_entry_size(&self) -> usize {
        self.offset_entry_size as usize
    }

    /// Byte offset of the `index`-th offset-table entry.
    #[inline]
    pub fn offset_entry_addr(&self, index: usize) -> usize {
        self.offset_table_offset + index * self.offset_entry_size()
    }

    /// The `{offset_table_offset, offset_table_size}` pair for hash bucket
    /// `bucket`.
    pub fn hash_entry(&self, buf: &[u8], bucket: usize) -> Result<(u16, u16), Error> {
        let addr = self.hash_table_offset + bucket * HASH_TABLE_ENTRY_SIZE;
        let raw = checked_slice(buf, addr, HASH_TABLE_ENTRY_SIZE)?;
        Ok((
            u16_from_le_bytes_ref(&raw[0..2]),
            u16_from_le_bytes_ref(&raw[2..4]),
        ))
    }

    /// Read the codepoint field of the offset-table entry at byte `addr`.
    pub fn read_codepoint(&self, buf: &[u8], addr: usize) -> Result<u32, Error> {
        let raw = checked_slice(buf, addr, self.codepoint_bytes as usize)?;
        Ok(read_variable_width(raw))
    }

    /// Read the offset field of the offset-table entry at byte `addr`.
    pub fn read_offset(&self, buf: &[u8], addr: usize) -> Result<u32, Error> {
        let raw = checked_slice(
            buf,
            addr + self.codepoint_bytes as usize,
            self.offset_field_bytes as usize,
        )?;
        Ok(read_variable_width(raw))
    }

    /// Overwrite the offset field of the offset-table entry at byte `addr`.
    pub fn write_offset(&self, buf: &mut [u8], addr: usize, value: u32) -> Result<(), Error> {
        let start = addr + self.codepoint_bytes as usize;
        let width = self.offset_field_bytes as usize;
        let raw = buf
            .get_mut(start..start + width)
            .ok_or(Error::MalformedFont)?;
        write_variable_width(raw, value);
        Ok(())
    }

    /// Absolute byte address of the glyph header that `offset` (as stored in
    /// an offset-table entry) points to.
    #[inline]
    pub fn glyph_header_addr(&self, offset: u32) -> usize {
        self.glyph_region_offset + offset as usize
    }

    /// Read a glyph header's `(width, height)` at absolute address `addr`.
    pub fn glyph_dimensions(&self, buf: &[u8], addr: usize) -> Result<(u8, u8), Error> {
        let raw = checked_slice(buf, addr, GLYPH_INFO_SIZE)?;
        Ok((raw[0], raw[1]))
    }
}

fn read_variable_width(raw: &[u8]) -> u32 {
    match raw.len() {
        2 => u16_from_le_bytes_ref(raw) as u32,
        _ => {
            let mut padded = [0u8; 4];
            padded[..raw.len()].copy_from_slice(raw);
            crate::utils::u32_from_le_bytes_ref(&padded)
        }
    }
}

fn write_variable_width(raw: &mut [u8], value: u32) {
    match raw.len() {
        2 => write_u16_le(raw, value as u16),
        _ => {
            let mut padded = [0u8; 4];
            write_u32_le(&mut padded, value);
            raw.copy_from_slice(&padded[..raw.len()]);
        }
    }
}

/// An offset value counts as "present" only when it is neither the absent
/// sentinel, the tofu alias, nor zero (spec §4.2).
#[inline]
pub fn offset_is_valid(raw_offset: u32) -> bool {
    raw_offset != OFFSET_ABSENT && raw_offset != OFFSET_TOFU_ALIAS && raw_offset != 0
}


#[cfg(test)]
mod test {
    use super::test_support::FontBuilder;
    use super::*;

    #[test]
    fn parses_v2_header() {
        let image = FontBuilder::new(16, 2, true)
            .with_glyph(b'A' as u32, 5, 7)
            .build();
        let desc = FontImageDescriptor::parse(&image).unwrap();
        assert_eq!(desc.version, 2);
        assert_eq!(desc.hash_table_size, 16);
        assert_eq!(desc.codepoint_bytes, 2);
        assert_eq!(desc.offset_field_bytes, 2);
        assert_eq!(desc.glyph_amount, 1);
    }

    #[test]
    fn rejects_truncated_buffer() {
        let image = FontBuilder::new(16, 2, true)
            .with_glyph(b'A' as u32, 5, 7)
            .build();
        assert!(FontImageDescriptor::parse(&image[..4]).is_err());
    }

    #[test]
    fn offset_validity_sentinels() {
        assert!(!offset_is_valid(OFFSET_ABSENT));
        assert!(!offset_is_valid(OFFSET_TOFU_ALIAS));
        assert!(!offset_is_valid(0));
        assert!(offset_is_valid(42));
    }
}
