//! Two-state bit-field helpers for packed register and memory words.
//!
//! Every value in the servo model is a fixed-width unsigned word of at most
//! 64 bits. [`BitField`] names a contiguous slice of such a word and
//! provides extraction and insertion with truncation, which is how a
//! hardware assignment to a narrower signal behaves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns a mask with the low `width` bits set.
///
/// Widths of 64 or more saturate to `u64::MAX`.
pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// A contiguous range of bits `[offset, offset + width)` within a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitField {
    /// Index of the least significant bit of the field.
    pub offset: u32,
    /// Number of bits in the field.
    pub width: u32,
}

impl BitField {
    /// Creates a field covering `width` bits starting at `offset`.
    pub fn new(offset: u32, width: u32) -> Self {
        debug_assert!(
            offset + width <= 64,
            "field [{offset}, {}) exceeds 64 bits",
            offset + width
        );
        Self { offset, width }
    }

    /// Creates a single-bit field at `offset`.
    pub fn bit(offset: u32) -> Self {
        Self::new(offset, 1)
    }

    /// Index one past the most significant bit of the field.
    pub fn end(&self) -> u32 {
        self.offset + self.width
    }

    /// The field mask shifted into position.
    pub fn mask(&self) -> u64 {
        if self.width == 0 {
            0
        } else {
            mask(self.width) << self.offset
        }
    }

    /// Extracts the field from `word`, right-aligned.
    pub fn extract(&self, word: u64) -> u64 {
        if self.width == 0 {
            return 0;
        }
        (word >> self.offset) & mask(self.width)
    }

    /// Returns true if a single-bit field is set in `word`.
    pub fn is_set(&self, word: u64) -> bool {
        self.extract(word) != 0
    }

    /// Returns `word` with the field replaced by `value`.
    ///
    /// `value` is truncated to the field width.
    pub fn insert(&self, word: u64, value: u64) -> u64 {
        if self.width == 0 {
            return word;
        }
        (word & !self.mask()) | ((value & mask(self.width)) << self.offset)
    }
}

impl fmt::Display for BitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            0 => write!(f, "[]"),
            1 => write!(f, "[{}]", self.offset),
            _ => write!(f, "[{}:{}]", self.end() - 1, self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_widths() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 1);
        assert_eq!(mask(18), 0x3FFFF);
        assert_eq!(mask(64), u64::MAX);
        assert_eq!(mask(70), u64::MAX);
    }

    #[test]
    fn extract_high_half() {
        let f = BitField::new(18, 18);
        let word = (0x2AAAAu64 << 18) | 0x15555;
        assert_eq!(f.extract(word), 0x2AAAA);
    }

    #[test]
    fn insert_truncates_value() {
        let f = BitField::new(4, 4);
        assert_eq!(f.insert(0, 0x1F), 0xF0);
    }

    #[test]
    fn insert_preserves_other_bits() {
        let f = BitField::new(8, 8);
        assert_eq!(f.insert(0xFFFF_FFFF, 0), 0xFFFF_00FF);
    }

    #[test]
    fn single_bit() {
        let f = BitField::bit(5);
        assert!(f.is_set(0b10_0000));
        assert!(!f.is_set(0b01_1111));
        assert_eq!(f.mask(), 0b10_0000);
    }

    #[test]
    fn empty_field_is_inert() {
        let f = BitField::new(3, 0);
        assert_eq!(f.mask(), 0);
        assert_eq!(f.extract(u64::MAX), 0);
        assert_eq!(f.insert(0xAB, 0xFF), 0xAB);
    }

    #[test]
    fn full_width_field() {
        let f = BitField::new(0, 64);
        assert_eq!(f.extract(u64::MAX), u64::MAX);
        assert_eq!(f.insert(0, u64::MAX), u64::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(BitField::new(0, 18).to_string(), "[17:0]");
        assert_eq!(BitField::bit(20).to_string(), "[20]");
        assert_eq!(BitField::new(2, 0).to_string(), "[]");
    }

    #[test]
    fn serde_roundtrip() {
        let f = BitField::new(7, 3);
        let json = serde_json::to_string(&f).unwrap();
        let back: BitField = serde_json::from_str(&json).unwrap();
        assert_eq!(f, back);
    }
}
