//! Eviction planner (spec §4.5).
//!
//! Glyph payloads are variable-sized and interleaved with their timestamps,
//! so there is no cheap in-place hole to punch; eviction instead rebuilds a
//! fresh empty image from the current one (legal because a cache image is
//! itself a structurally valid font image) and re-inserts the survivors.

use alloc::vec::Vec;

use crate::builder::build_empty;
use crate::error::Error;
use crate::font_image::{offset_is_valid, FontImageDescriptor, CACHE_COUNT, TIMESTAMP_SIZE};
use crate::insert::add_glyphs;

/// Drop the `remove_count` least-recently-used glyphs not present in
/// `keep_codepoints`, then re-insert the survivors plus whatever
/// `keep_codepoints` names (the caller's `already_present` set).
pub fn evict(
    image: &mut Vec<u8>,
    cached_glyph_count: &mut usize,
    source: &[u8],
    keep_codepoints: &[u32],
    remove_count: usize,
    tick: u32,
) -> Result<(), Error> {
    if remove_count == 0 || image.is_empty() {
        return Ok(());
    }

    let desc = FontImageDescriptor::parse(image)?;
    let mut candidates: Vec<(u32, u32)> = Vec::new(); // (codepoint, timestamp)

    for i in 0..desc.glyph_amount as usize {
        let addr = desc.offset_entry_addr(i);
        let offset = desc.read_offset(image, addr)?;
        if !offset_is_valid(offset) {
            continue;
        }
        let codepoint = desc.read_codepoint(image, addr)?;
        if keep_codepoints.contains(&codepoint) {
            continue;
        }
        let glyph_addr = desc.glyph_header_addr(offset);
        let timestamp_addr = glyph_addr - TIMESTAMP_SIZE;
        let raw = image
            .get(timestamp_addr..timestamp_addr + TIMESTAMP_SIZE)
            .ok_or(Error::MalformedFont)?;
        let timestamp = crate::utils::u32_from_le_bytes_ref(raw);
        candidates.push((codepoint, timestamp));

        if candidates.len() > CACHE_COUNT {
            log::warn!(
                "font cache: more evictable glyphs ({}) than CACHE_COUNT ({}), truncating",
                candidates.len(),
                CACHE_COUNT
            );
            break;
        }
    }

    candidates.sort_by_key(|&(_, timestamp)| timestamp);
    let remove_count = remove_count.min(candidates.len());

    log::debug!(
        "font cache: evicting {} of {} cached glyphs",
        remove_count,
        cached_glyph_count
    );

    let mut roster: Vec<u32> = Vec::with_capacity(keep_codepoints.len() + candidates.len());
    roster.extend_from_slice(keep_codepoints);
    roster.extend(candidates[remove_count..].iter().map(|&(cp, _)| cp));

    let fresh = build_empty(image)?;
    *image = fresh;
    *cached_glyph_count = 0;
    add_glyphs(image, cached_glyph_count, source, &roster, tick)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::builder::build_empty;
    use crate::font_image::test_support::FontBuilder;
    use crate::insert::add_glyphs;

    fn codepoints(start: u8, count: u8) -> Vec<u32> {
        (0..count).map(|i| (start + i) as u32).collect()
    }

    #[test]
    fn evicts_oldest_first() {
        let cps = codepoints(b'A', 22);
        let mut builder = FontBuilder::new(64, 2, true);
        for &cp in &cps {
            builder = builder.with_glyph(cp, 4, 4);
        }
        builder = builder.with_glyph('X' as u32, 4, 4);
        let source = builder.build();

        let mut image = build_empty(&source).unwrap();
        let mut count = 0usize;
        for (i, &cp) in cps.iter().enumerate() {
            add_glyphs(&mut image, &mut count, &source, &[cp], 100 + i as u32).unwrap();
        }
        assert_eq!(count, 22);

        evict(&mut image, &mut count, &source, &[], 1, 200).unwrap();
        assert_eq!(count, 21);
        add_glyphs(&mut image, &mut count, &source, &['X' as u32], 201).unwrap();
        assert_eq!(count, 22);

        let desc = FontImageDescriptor::parse(&image).unwrap();
        let oldest = cps[0];
        let addr = crate::lookup::find_offset_entry(&desc, &image, oldest)
            .unwrap()
            .unwrap();
        let offset = desc.read_offset(&image, addr).unwrap();
        assert!(!offset_is_valid(offset), "oldest glyph should be evicted");

        let addr = crate::lookup::find_offset_entry(&desc, &image, 'X' as u32)
            .unwrap()
            .unwrap();
        let offset = desc.read_offset(&image, addr).unwrap();
        assert!(offset_is_valid(offset), "new glyph should be present");
    }

    #[test]
    fn clamps_remove_count_to_evictable() {
        let source = FontBuilder::new(16, 2, true)
            .with_glyph('A' as u32, 4, 4)
            .build();
        let mut image = build_empty(&source).unwrap();
        let mut count = 0usize;
        add_glyphs(&mut image, &mut count, &source, &['A' as u32], 1).unwrap();

        // only one evictable glyph exists; ask for far more.
        evict(&mut image, &mut count, &source, &[], 50, 2).unwrap();
        assert_eq!(count, 0);
    }
}
