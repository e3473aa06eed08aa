//! Word and long value model
//!
//! A [`Word`] is 12 bits wide and lives in a `u16`; a [`Long`] is 24 bits wide,
//! lives in a `u32`, and is stored as two words with the high word first.

/// Native 12-bit machine word
pub type Word = u16;

/// 24-bit value built from two words
pub type Long = u32;

/// Word index into the address space (always a long)
pub type Addr = u32;

/// Number of bits in a word
pub const WORD_BITS: u32 = 12;

/// Mask for the 12 valid bits of a word
pub const WORD_MASK: u32 = 0xFFF;

/// Number of bits in a long
pub const LONG_BITS: u32 = 24;

/// Mask for the 24 valid bits of a long
pub const LONG_MASK: u32 = 0xFF_FFFF;

/// Operand width for ALU operations and conditional jumps
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    /// 12-bit word
    Word,
    /// 24-bit long
    Long,
}

impl Width {
    /// Number of bits at this width
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Width::Word => WORD_BITS,
            Width::Long => LONG_BITS,
        }
    }

    /// Mask of valid bits at this width
    #[inline]
    pub const fn mask(self) -> u32 {
        match self {
            Width::Word => WORD_MASK,
            Width::Long => LONG_MASK,
        }
    }

    /// The most significant (sign) bit at this width
    #[inline]
    pub const fn msb(self) -> u32 {
        1 << (self.bits() - 1)
    }

    /// Interprets `v` as a two's-complement value of this width
    #[inline]
    pub const fn sign_extend(self, v: u32) -> i32 {
        let shift = 32 - self.bits();
        ((v << shift) as i32) >> shift
    }
}

/// Truncates a host value to a word
#[inline]
pub const fn word(v: u32) -> Word {
    (v & WORD_MASK) as Word
}

/// Truncates a host value to a long
#[inline]
pub const fn long(v: u32) -> Long {
    v & LONG_MASK
}

/// Builds a long from its high and low words
#[inline]
pub const fn join(hi: Word, lo: Word) -> Long {
    ((hi as u32 & WORD_MASK) << WORD_BITS) | (lo as u32 & WORD_MASK)
}

/// Splits a long into `(high, low)` words
#[inline]
pub const fn split(v: Long) -> (Word, Word) {
    (word(v >> WORD_BITS), word(v))
}

/// Sign-extends a 12-bit word
#[inline]
pub const fn sext(w: Word) -> i32 {
    Width::Word.sign_extend(w as u32)
}

/// Sign-extends a 24-bit long
#[inline]
pub const fn sext_long(v: Long) -> i32 {
    Width::Long.sign_extend(v)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn join_and_split() {
        assert_eq!(join(0x001, 0xFFF), 0x1FFF);
        assert_eq!(join(0xFFF, 0xFFF), LONG_MASK);
        assert_eq!(split(0x1FFF), (0x001, 0xFFF));
        assert_eq!(split(0xABC_DEF), (0xABC, 0xDEF));

        // Stray high bits in either half are dropped
        assert_eq!(join(0xF001, 0xFFFF), 0x1FFF);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sext(0x7FF), 2047);
        assert_eq!(sext(0x800), -2048);
        assert_eq!(sext(0xFFF), -1);
        assert_eq!(sext_long(0x7F_FFFF), 0x7F_FFFF);
        assert_eq!(sext_long(0xFF_FFFF), -1);
        assert_eq!(sext_long(0x80_0000), -0x80_0000);
    }

    #[test]
    fn masking() {
        assert_eq!(word(0x1000), 0);
        assert_eq!(word(0x1234), 0x234);
        assert_eq!(long(0x100_0000), 0);
        assert_eq!(Width::Word.msb(), 0x800);
        assert_eq!(Width::Long.msb(), 0x80_0000);
    }
}
