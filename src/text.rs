//! Codepoint decoding (spec §4.6 step 1).
//!
//! Not a general-purpose UTF-8 decoder: it reproduces the exact behavior of
//! the external decoder utility this crate does not own, including its
//! treatment of a malformed leading byte as codepoint `0`, consuming a
//! single byte (grounded in the bit-masked decode loop in
//! `original_source/rcore/font_cache.c`). A host that supplies a stricter
//! UTF-8 decoder will reject strings this accepts; flagged in DESIGN.md as a
//! compatibility behavior to revisit, per spec.md's own open question.

/// Iterator over the codepoints of a byte string, decoded with the legacy
/// malformed-byte behavior above.
pub struct Codepoints<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Codepoints<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl<'a> Iterator for Codepoints<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let b0 = *self.bytes.get(self.pos)?;

        let (codepoint, consumed) = if b0 & 0b1000_0000 == 0 {
            (b0 as u32, 1)
        } else if b0 & 0b1110_0000 == 0b1100_0000 {
            if let Some(&b1) = self.bytes.get(self.pos + 1) {
                (
                    ((b0 as u32 & 0b1_1111) << 6) | (b1 as u32 & 0b11_1111),
                    2,
                )
            } else {
                (0, 1)
            }
        } else if b0 & 0b1111_0000 == 0b1110_0000 {
            if let (Some(&b1), Some(&b2)) =
                (self.bytes.get(self.pos + 1), self.bytes.get(self.pos + 2))
            {
                (
                    ((b0 as u32 & 0b1111) << 12)
                        | ((b1 as u32 & 0b11_1111) << 6)
                        | (b2 as u32 & 0b11_1111),
                    3,
                )
            } else {
                (0, 1)
            }
        } else if b0 & 0b1111_1000 == 0b1111_0000 {
            if let (Some(&b1), Some(&b2), Some(&b3)) = (
                self.bytes.get(self.pos + 1),
                self.bytes.get(self.pos + 2),
                self.bytes.get(self.pos + 3),
            ) {
                (
                    ((b0 as u32 & 0b111) << 18)
                        | ((b1 as u32 & 0b11_1111) << 12)
                        | ((b2 as u32 & 0b11_1111) << 6)
                        | (b3 as u32 & 0b11_1111),
                    4,
                )
            } else {
                (0, 1)
            }
        } else {
            (0, 1)
        };

        self.pos += consumed;
        Some(codepoint)
    }
}

/// Decode `text` into its sequence of codepoints.
pub fn decode_codepoints(text: &str) -> Codepoints<'_> {
    Codepoints::new(text.as_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_ascii() {
        let cps: Vec<u32> = decode_codepoints("Hi").collect();
        assert_eq!(cps, vec!['H' as u32, 'i' as u32]);
    }

    #[test]
    fn decodes_three_byte_euro_sign() {
        let cps: Vec<u32> = decode_codepoints("\u{20AC}").collect();
        assert_eq!(cps, vec![0x20AC]);
    }

    #[test]
    fn decodes_four_byte_sequence() {
        let cps: Vec<u32> = decode_codepoints("\u{1F600}").collect();
        assert_eq!(cps, vec![0x1F600]);
    }

    #[test]
    fn truncated_multibyte_sequence_yields_codepoint_zero() {
        // A lone two-byte lead with no continuation byte; built from raw
        // bytes since `&str` can't hold invalid UTF-8.
        let cps: Vec<u32> = Codepoints::new(&[0xC2]).collect();
        assert_eq!(cps, vec![0]);
    }
}
