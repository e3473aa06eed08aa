//! Program image format
//!
//! An image is a sequence of blocks, each made of a little-endian header
//! (`i32` ROM offset, `i32` word count) followed by `count` little-endian
//! `u16` words.
use crate::{error::LoadError, word::Word};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, I32, U16,
};

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
struct BlockHeader {
    offset: I32<LittleEndian>,
    count: I32<LittleEndian>,
}

/// A run of words to be copied into ROM
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Offset from the start of ROM
    pub offset: i32,
    /// Word values (masked to 12 bits when loaded)
    pub words: Vec<Word>,
}

/// Splits an image into blocks
///
/// Offsets are not checked here; see
/// [`Memory::load_rom`](crate::Memory::load_rom).
pub fn parse(data: &[u8]) -> Result<Vec<Block>, LoadError> {
    let mut out = vec![];
    let mut rest = data;
    while !rest.is_empty() {
        let offset = data.len() - rest.len();
        let (header, tail) = BlockHeader::read_from_prefix(rest)
            .map_err(|_| LoadError::Truncated { offset })?;
        let count = header.count.get();
        let n = usize::try_from(count)
            .map_err(|_| LoadError::NegativeCount { offset, count })?;
        let (words, tail) =
            <[U16<LittleEndian>]>::ref_from_prefix_with_elems(tail, n)
                .map_err(|_| LoadError::Truncated {
                    offset: data.len() - tail.len(),
                })?;
        out.push(Block {
            offset: header.offset.get(),
            words: words.iter().map(|w| w.get()).collect(),
        });
        rest = tail;
    }
    Ok(out)
}

/// Serializes blocks into an image
pub fn to_bytes(blocks: &[Block]) -> Vec<u8> {
    let mut out = vec![];
    for b in blocks {
        let header = BlockHeader {
            offset: I32::new(b.offset),
            count: I32::new(b.words.len() as i32),
        };
        out.extend_from_slice(header.as_bytes());
        for &w in &b.words {
            out.extend_from_slice(U16::<LittleEndian>::new(w).as_bytes());
        }
    }
    out
}
