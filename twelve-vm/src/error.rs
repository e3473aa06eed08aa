//! Error types
use crate::word::{Addr, Word};
use thiserror::Error;

/// Fatal execution fault
///
/// Any fault aborts the run loop; the machine state is left as it was at the
/// point of failure so that it can be inspected.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum Fault {
    /// The word at PC is not an opcode
    #[error("unknown opcode {op:#05x}")]
    UnknownOpcode {
        /// The offending word
        op: Word,
    },

    /// The mode word following `jmp` is not a known mode
    #[error("unknown jump mode {mode}")]
    UnknownJumpMode {
        /// The offending mode word
        mode: Word,
    },

    /// Attempted write into the ROM region
    #[error("write to ROM address {addr:#08x}")]
    RomWrite {
        /// Target address
        addr: Addr,
    },

    /// Address past the end of memory
    #[error("address {addr:#08x} is out of range")]
    OutOfRange {
        /// Requested address
        addr: Addr,
    },

    /// `div` or `mod` (word or long) with a zero divisor
    #[error("division by zero")]
    DivideByZero,
}

/// A [`Fault`] tagged with the address of the instruction that raised it
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("fault at pc {pc:#08x}: {fault}")]
pub struct Trap {
    /// Address of the faulting instruction
    pub pc: Addr,
    /// What went wrong
    #[source]
    pub fault: Fault,
}

/// Errors raised while configuring memory or loading a program image
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Trailing partial block header or word data
    #[error("image truncated at byte {offset}")]
    Truncated {
        /// Byte offset of the incomplete item
        offset: usize,
    },

    /// Block header with a negative word count
    #[error("block at byte {offset} has negative length {count}")]
    NegativeCount {
        /// Byte offset of the block header
        offset: usize,
        /// Word count from the header
        count: i32,
    },

    /// Block extends outside the ROM region
    #[error(
        "block [{start}, {start} + {len}) does not fit in {rom_size}-word ROM"
    )]
    OutsideRom {
        /// Block offset from the start of ROM
        start: i64,
        /// Block length in words
        len: usize,
        /// Size of ROM in words
        rom_size: u32,
    },

    /// Region sizes add up to more than 2^24 words
    #[error(
        "memory layout of {total:#x} words exceeds the 24-bit address space"
    )]
    LayoutTooLarge {
        /// Sum of the region sizes
        total: u64,
    },
}
