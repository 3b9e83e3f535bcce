//! Cache image construction (spec §4.3).

use alloc::vec::Vec;

use crate::error::Error;
use crate::font_image::{
    offset_is_valid, FontImageDescriptor, GLYPH_INFO_SIZE, OFFSET_ABSENT, OFFSET_TOFU_ALIAS,
    TOFU_RELATIVE_OFFSET,
};

/// Build an empty cache image from `source` (or from an existing cache image
/// used as a template during eviction — both are structurally font images).
///
/// The result carries the header, hash table, offset table and tofu glyph
/// verbatim; every other offset-table entry is reset to [`OFFSET_ABSENT`].
pub fn build_empty(source: &[u8]) -> Result<Vec<u8>, Error> {
    let desc = FontImageDescriptor::parse(source)?;

    // The tofu glyph's own record starts 4 bytes into the glyph region (the
    // leading 4 bytes are reserved); its end is the natural boundary for the
    // prefix we copy (see SPEC_FULL.md §3 for why this differs from a
    // literal reading of the spec's size formula).
    let tofu_addr = desc.glyph_header_addr(TOFU_RELATIVE_OFFSET);
    let (tofu_width, tofu_height) = desc.glyph_dimensions(source, tofu_addr)?;
    let tofu_size = GLYPH_INFO_SIZE + (tofu_width as usize) * (tofu_height as usize);
    let prefix_len = tofu_addr + tofu_size;

    let prefix = source.get(..prefix_len).ok_or(Error::MalformedFont)?;
    let mut image = Vec::with_capacity(prefix_len);
    image.extend_from_slice(prefix);

    // The header/hash/offset-table layout is unchanged by the copy, so this
    // reparse is just bookkeeping, not a second structural validation.
    let desc = FontImageDescriptor::parse(&image)?;
    for i in 0..desc.glyph_amount as usize {
        let addr = desc.offset_entry_addr(i);
        let current = desc.read_offset(&image, addr)?;
        if current == OFFSET_TOFU_ALIAS {
            continue;
        }
        desc.write_offset(&mut image, addr, OFFSET_ABSENT)?;
    }

    debug_assert!(offset_is_valid(OFFSET_TOFU_ALIAS) == false);
    Ok(image)
}
