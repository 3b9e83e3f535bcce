//! Hash-bucket lookup by codepoint (spec §4.2).

use crate::error::Error;
use crate::font_image::FontImageDescriptor;

/// Find the offset-table entry for `codepoint`, returning its byte address.
///
/// The hash table partitions codepoints into short contiguous runs in the
/// offset table; the scan is bounded by the bucket's `offset_table_size` so
/// an absent codepoint never walks past its run.
pub fn find_offset_entry(
    desc: &FontImageDescriptor,
    buf: &[u8],
    codepoint: u32,
) -> Result<Option<usize>, Error> {
    if desc.hash_table_size == 0 {
        return Ok(None);
    }
    let bucket = (codepoint % desc.hash_table_size as u32) as usize;
    let (offset_table_offset, offset_table_size) = desc.hash_entry(buf, bucket)?;

    let mut addr = desc.offset_entry_addr(offset_table_offset as usize);
    for _ in 0..offset_table_size {
        let entry_codepoint = desc.read_codepoint(buf, addr)?;
        if entry_codepoint == codepoint {
            return Ok(Some(addr));
        }
        addr += desc.offset_entry_size();
    }
    Ok(None)
}
