//! Flat word memory, partitioned into regions
use crate::{
    error::{Fault, LoadError},
    word::{self, Addr, Long, Word, LONG_MASK},
};
use static_assertions::const_assert;

/// Default size of general-purpose RAM, in words
pub const DEFAULT_RAM_SIZE: u32 = 0x1_0000;

/// Default size of the graphics-register block, in words
pub const DEFAULT_GRAM_SIZE: u32 = 0x40;

/// Default size of video RAM, in words (320 x 240)
pub const DEFAULT_VRAM_SIZE: u32 = 320 * 240;

/// Default size of program ROM, in words
pub const DEFAULT_ROM_SIZE: u32 = 0x1_0000;

const_assert!(
    DEFAULT_RAM_SIZE + DEFAULT_GRAM_SIZE + DEFAULT_VRAM_SIZE + DEFAULT_ROM_SIZE
        <= LONG_MASK + 1
);

/// One of the four contiguous memory regions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// General read/write memory, which also holds the stack
    Ram,
    /// Graphics registers (may be empty)
    Gram,
    /// Video memory, read by the renderer
    Vram,
    /// Program memory, read-only once loaded
    Rom,
}

/// Region sizes, which determine every region's base address
///
/// Regions are laid out in the order RAM, GRAM, VRAM, ROM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    ram: u32,
    gram: u32,
    vram: u32,
    rom: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            ram: DEFAULT_RAM_SIZE,
            gram: DEFAULT_GRAM_SIZE,
            vram: DEFAULT_VRAM_SIZE,
            rom: DEFAULT_ROM_SIZE,
        }
    }
}

impl Layout {
    /// Builds a layout from region sizes (in words)
    pub fn new(
        ram: u32,
        gram: u32,
        vram: u32,
        rom: u32,
    ) -> Result<Self, LoadError> {
        let total: u64 =
            [ram, gram, vram, rom].iter().map(|&n| u64::from(n)).sum();
        if total > u64::from(LONG_MASK) + 1 {
            return Err(LoadError::LayoutTooLarge { total });
        }
        Ok(Self {
            ram,
            gram,
            vram,
            rom,
        })
    }

    /// Base address of the given region
    pub fn base(&self, r: Region) -> Addr {
        match r {
            Region::Ram => 0,
            Region::Gram => self.ram,
            Region::Vram => self.ram + self.gram,
            Region::Rom => self.ram + self.gram + self.vram,
        }
    }

    /// Size of the given region, in words
    pub fn size(&self, r: Region) -> u32 {
        match r {
            Region::Ram => self.ram,
            Region::Gram => self.gram,
            Region::Vram => self.vram,
            Region::Rom => self.rom,
        }
    }

    /// Shorthand for `self.base(Region::Rom)`
    pub fn rom_base(&self) -> Addr {
        self.base(Region::Rom)
    }

    /// Total number of words in the address space
    pub fn total(&self) -> u32 {
        self.ram + self.gram + self.vram + self.rom
    }

    /// Finds the region containing `addr`, if any
    pub fn region(&self, addr: Addr) -> Option<Region> {
        [Region::Ram, Region::Gram, Region::Vram, Region::Rom]
            .into_iter()
            .find(|&r| {
                addr >= self.base(r) && addr - self.base(r) < self.size(r)
            })
    }
}

/// The machine's word-addressed memory
pub struct Memory {
    layout: Layout,
    data: Box<[Word]>,
}

impl Memory {
    /// Builds a new zero-initialized memory with the given layout
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            data: vec![0; layout.total() as usize].into_boxed_slice(),
        }
    }

    /// Returns the region layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Reads a word
    #[inline]
    pub fn read(&self, addr: Addr) -> Result<Word, Fault> {
        self.data
            .get(addr as usize)
            .copied()
            .ok_or(Fault::OutOfRange { addr })
    }

    /// Writes a word, masking it to 12 bits
    ///
    /// Writes into ROM fail without modifying memory.
    #[inline]
    pub fn write(&mut self, addr: Addr, v: Word) -> Result<(), Fault> {
        self.check_writable(addr)?;
        self.data[addr as usize] = word::word(u32::from(v));
        Ok(())
    }

    /// Writes a long, high word at `addr` and low word after it
    ///
    /// Both addresses are checked before either is written.
    pub fn write_long(&mut self, addr: Addr, v: Long) -> Result<(), Fault> {
        let next = word::long(addr.wrapping_add(1));
        self.check_writable(addr)?;
        self.check_writable(next)?;
        let (hi, lo) = word::split(v);
        self.data[addr as usize] = hi;
        self.data[next as usize] = lo;
        Ok(())
    }

    #[inline]
    fn check_writable(&self, addr: Addr) -> Result<(), Fault> {
        if addr >= self.layout.total() {
            Err(Fault::OutOfRange { addr })
        } else if addr >= self.layout.rom_base() {
            Err(Fault::RomWrite { addr })
        } else {
            Ok(())
        }
    }

    /// Copies `len` words from `src` to `dst`, one word at a time, lowest
    /// address first
    ///
    /// Overlapping ranges are not handled specially: copying forward onto an
    /// overlapping higher destination repeats the leading source words.  The
    /// whole destination range is checked before anything is written.
    pub fn copy(
        &mut self,
        src: Addr,
        dst: Addr,
        len: u32,
    ) -> Result<(), Fault> {
        if len == 0 {
            return Ok(());
        }
        let last = |base: Addr| {
            base.checked_add(len - 1)
                .ok_or(Fault::OutOfRange { addr: base })
        };
        self.read(last(src)?)?;
        self.check_writable(dst)?;
        self.check_writable(last(dst)?)?;
        for i in 0..len {
            let v = self.data[(src + i) as usize];
            self.data[(dst + i) as usize] = v;
        }
        Ok(())
    }

    /// Populates ROM at load time, bypassing write protection
    ///
    /// `offset` is relative to the start of ROM.  Values are masked to 12
    /// bits.
    pub fn load_rom(
        &mut self,
        offset: i64,
        words: &[Word],
    ) -> Result<(), LoadError> {
        let rom_size = self.layout.size(Region::Rom);
        let err = LoadError::OutsideRom {
            start: offset,
            len: words.len(),
            rom_size,
        };
        let Ok(start) = u32::try_from(offset) else {
            return Err(err);
        };
        if u64::from(start) + words.len() as u64 > u64::from(rom_size) {
            return Err(err);
        }
        let base = (self.layout.rom_base() + start) as usize;
        for (d, &w) in self.data[base..][..words.len()].iter_mut().zip(words) {
            *d = word::word(u32::from(w));
        }
        Ok(())
    }

    /// Zeroes every writable region, leaving ROM intact
    pub fn clear_writable(&mut self) {
        let rom = self.layout.rom_base() as usize;
        self.data[..rom].fill(0);
    }

    /// Shared borrow of the entire memory array
    #[inline]
    pub fn words(&self) -> &[Word] {
        &self.data
    }

    /// Shared borrow of one region
    pub fn region_words(&self, r: Region) -> &[Word] {
        let base = self.layout.base(r) as usize;
        &self.data[base..][..self.layout.size(r) as usize]
    }
}
