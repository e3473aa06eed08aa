//! Operand stack and memory access
//!
//! The stack lives in RAM and grows upward; `sp` points at the highest
//! occupied slot.  Longs occupy two slots with the low word on top.
use crate::{
    error::Fault,
    word::{self, Addr, Long, Width, Word},
    Vm,
};

/// Stack manipulation instructions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackOp {
    /// Pushes an immediate word
    Push(Word),
    /// Pushes an immediate long
    PushLong(Long),
    /// Discards the top value
    Pop(Width),
    /// Duplicates the top value
    Dup(Width),
    /// Exchanges the top two values
    Swap(Width),
    /// Copies the second word to the top
    Over,
}

/// Memory access instructions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemOp {
    /// Pushes the value at an absolute address
    Load(Width, Addr),
    /// Pops a value into an absolute address
    Store(Width, Addr),
    /// Pops an address (as a long), then pushes the value stored there
    LoadIndirect(Width),
    /// Pops a value, then an address, and stores the value at that address
    StoreIndirect(Width),
    /// Pops a length, destination and source (all longs), then copies
    /// words forward from source to destination
    Copy,
}

impl Vm {
    /// Pushes a word onto the operand stack
    pub(crate) fn push(&mut self, v: Word) -> Result<(), Fault> {
        let sp = word::long(self.regs.sp.wrapping_add(1));
        self.mem.write(sp, v)?;
        self.regs.sp = sp;
        self.stats.stack_high_water = self.stats.stack_high_water.max(sp);
        Ok(())
    }

    /// Pops a word from the operand stack
    pub(crate) fn pop(&mut self) -> Result<Word, Fault> {
        let v = self.mem.read(self.regs.sp)?;
        self.regs.sp = word::long(self.regs.sp.wrapping_sub(1));
        Ok(v)
    }

    /// Pushes a long, high word first
    pub(crate) fn push_long(&mut self, v: Long) -> Result<(), Fault> {
        let (hi, lo) = word::split(v);
        self.push(hi)?;
        self.push(lo)
    }

    /// Pops a long, low word first
    pub(crate) fn pop_long(&mut self) -> Result<Long, Fault> {
        let lo = self.pop()?;
        let hi = self.pop()?;
        Ok(word::join(hi, lo))
    }

    pub(crate) fn push_width(&mut self, w: Width, v: u32) -> Result<(), Fault> {
        match w {
            Width::Word => self.push(word::word(v)),
            Width::Long => self.push_long(word::long(v)),
        }
    }

    pub(crate) fn pop_width(&mut self, w: Width) -> Result<u32, Fault> {
        match w {
            Width::Word => self.pop().map(u32::from),
            Width::Long => self.pop_long(),
        }
    }

    /// Reads a word or a long (high word at `addr`)
    pub(crate) fn read_width(
        &self,
        w: Width,
        addr: Addr,
    ) -> Result<u32, Fault> {
        match w {
            Width::Word => self.mem.read(addr).map(u32::from),
            Width::Long => {
                let hi = self.mem.read(addr)?;
                let lo = self.mem.read(word::long(addr.wrapping_add(1)))?;
                Ok(word::join(hi, lo))
            }
        }
    }

    /// Writes a word or a long (high word at `addr`)
    pub(crate) fn write_width(
        &mut self,
        w: Width,
        addr: Addr,
        v: u32,
    ) -> Result<(), Fault> {
        match w {
            Width::Word => self.mem.write(addr, word::word(v)),
            Width::Long => self.mem.write_long(addr, word::long(v)),
        }
    }

    pub(crate) fn exec_stack(&mut self, op: StackOp) -> Result<(), Fault> {
        match op {
            StackOp::Push(v) => self.push(v)?,
            StackOp::PushLong(v) => self.push_long(v)?,
            StackOp::Pop(w) => {
                self.pop_width(w)?;
            }
            StackOp::Dup(w) => {
                let v = self.pop_width(w)?;
                self.push_width(w, v)?;
                self.push_width(w, v)?;
            }
            StackOp::Swap(w) => {
                let b = self.pop_width(w)?;
                let a = self.pop_width(w)?;
                self.push_width(w, b)?;
                self.push_width(w, a)?;
            }
            StackOp::Over => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a)?;
                self.push(b)?;
                self.push(a)?;
            }
        }
        Ok(())
    }

    pub(crate) fn exec_mem(&mut self, op: MemOp) -> Result<(), Fault> {
        match op {
            MemOp::Load(w, addr) => {
                let v = self.read_width(w, addr)?;
                self.push_width(w, v)
            }
            MemOp::Store(w, addr) => {
                let v = self.pop_width(w)?;
                self.write_width(w, addr, v)
            }
            MemOp::LoadIndirect(w) => {
                let addr = self.pop_long()?;
                let v = self.read_width(w, addr)?;
                self.push_width(w, v)
            }
            MemOp::StoreIndirect(w) => {
                let v = self.pop_width(w)?;
                let addr = self.pop_long()?;
                self.write_width(w, addr, v)
            }
            MemOp::Copy => {
                let len = self.pop_long()?;
                let dst = self.pop_long()?;
                let src = self.pop_long()?;
                self.mem.copy(src, dst, len)
            }
        }
    }
}
