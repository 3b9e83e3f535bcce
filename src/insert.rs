//! Glyph insertion (spec §4.4).

use alloc::vec::Vec;

use crate::error::Error;
use crate::font_image::{
    offset_is_valid, FontImageDescriptor, GLYPH_INFO_SIZE, OFFSET_TOFU_ALIAS, TIMESTAMP_SIZE,
};
use crate::lookup::find_offset_entry;
use crate::utils::write_u32_le;

/// Append `codepoints` to `image`, prefixing each new glyph record with a
/// 4-byte access timestamp (`tick`, read once for the whole batch — every
/// glyph added in the same `draw_text` call shares one access time).
///
/// Codepoints already present in `image`, and codepoints whose *source-side*
/// offset aliases the tofu glyph, are treated as already served and are
/// skipped entirely (spec §4.4 edge cases) — neither counts toward the
/// bytes grown nor toward `cached_glyph_count`.
pub fn add_glyphs(
    image: &mut Vec<u8>,
    cached_glyph_count: &mut usize,
    source: &[u8],
    codepoints: &[u32],
    tick: u32,
) -> Result<(), Error> {
    if codepoints.is_empty() {
        return Ok(());
    }

    let source_desc = FontImageDescriptor::parse(source)?;
    let cache_desc = FontImageDescriptor::parse(image)?;

    struct Pending {
        cache_entry_addr: usize,
        source_glyph_addr: usize,
        width: u8,
        height: u8,
    }
    let mut pending: Vec<Pending> = Vec::with_capacity(codepoints.len());

    for &codepoint in codepoints {
        let cache_entry_addr = find_offset_entry(&cache_desc, image, codepoint)?
            .ok_or(Error::MalformedFont)?;
        let cache_offset = cache_desc.read_offset(image, cache_entry_addr)?;
        if offset_is_valid(cache_offset) {
            continue; // already cached
        }

        let source_entry_addr = find_offset_entry(&source_desc, source, codepoint)?
            .ok_or(Error::MalformedFont)?;
        let source_offset = source_desc.read_offset(source, source_entry_addr)?;
        if source_offset == OFFSET_TOFU_ALIAS {
            continue; // served by the always-resident tofu glyph
        }

        let source_glyph_addr = source_desc.glyph_header_addr(source_offset);
        let (width, height) = source_desc.glyph_dimensions(source, source_glyph_addr)?;
        pending.push(Pending {
            cache_entry_addr,
            source_glyph_addr,
            width,
            height,
        });
    }

    if pending.is_empty() {
        return Ok(());
    }

    let total_added: usize = pending
        .iter()
        .map(|p| GLYPH_INFO_SIZE + p.width as usize * p.height as usize + TIMESTAMP_SIZE)
        .sum();

    let mut cursor = image.len();
    image.resize(cursor + total_added, 0);

    for p in &pending {
        let glyph_size = GLYPH_INFO_SIZE + p.width as usize * p.height as usize;
        let new_offset = (cursor - cache_desc.glyph_region_offset) as u32 + TIMESTAMP_SIZE as u32;
        cache_desc.write_offset(image, p.cache_entry_addr, new_offset)?;

        write_u32_le(&mut image[cursor..cursor + TIMESTAMP_SIZE], tick);
        let glyph_start = cursor + TIMESTAMP_SIZE;
        let source_bytes = source
            .get(p.source_glyph_addr..p.source_glyph_addr + glyph_size)
            .ok_or(Error::MalformedFont)?;
        image[glyph_start..glyph_start + glyph_size].copy_from_slice(source_bytes);

        cursor = glyph_start + glyph_size;
        *cached_glyph_count += 1;
    }
    debug_assert_eq!(cursor, image.len());

    Ok(())
}
