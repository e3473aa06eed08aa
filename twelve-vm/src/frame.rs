//! Stack frames and the calling convention
//!
//! A routine begins with two words, `[params, locals]`, and its code starts
//! immediately after them.  `locals` counts the parameters too, which the
//! caller has already pushed.
//!
//! On entry, the callee's frame looks like this (addresses increasing
//! downwards):
//!
//! ```text
//! fp - locals     local 0 (first parameter)
//! ...
//! fp - 1          local (locals - 1)
//! fp + 0, 1       return address (high, low)
//! fp + 2, 3       caller's frame pointer (high, low)
//! fp + 4          locals
//! fp + 5 ...      operand stack
//! ```
//!
//! Interrupt handlers get the same header, with their arguments as locals.
use crate::{
    error::Fault,
    word::{self, Addr, Width, Word},
    Vm,
};

/// Number of words in a frame header
pub const HEADER_SIZE: u32 = 5;

/// Calls, returns and local variable access
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameOp {
    /// Calls the routine at an absolute address
    Call(Addr),
    /// Pops a routine address (as a long) and calls it
    CallIndirect,
    /// Returns from the current frame
    Ret,
    /// Returns, keeping the top word of the operand stack
    Ret1,
    /// Returns, keeping the top long of the operand stack
    Ret2,
    /// Pushes local `k`
    LoadLocal(Width, Word),
    /// Pops a value into local `k`
    StoreLocal(Width, Word),
    /// Pushes the address of local `k` as a long
    AddrLocal(Word),
}

impl Vm {
    /// Pushes a frame header and points `fp` at it
    pub(crate) fn enter_frame(
        &mut self,
        ret: Addr,
        locals: Word,
    ) -> Result<(), Fault> {
        let fp = word::long(self.regs.sp.wrapping_add(1));
        let prev = self.regs.fp;
        self.push_long(ret)?;
        self.push_long(prev)?;
        self.push(locals)?;
        self.regs.fp = fp;
        Ok(())
    }

    /// Address of local 0 in the current frame
    pub(crate) fn local_base(&self) -> Result<Addr, Fault> {
        let locals = self.mem.read(self.regs.fp.wrapping_add(4))?;
        Ok(word::long(self.regs.fp.wrapping_sub(u32::from(locals))))
    }

    fn call(&mut self, target: Addr, ret: Addr) -> Result<Addr, Fault> {
        let params = self.mem.read(target)?;
        let locals = self.mem.read(word::long(target.wrapping_add(1)))?;
        self.regs.sp = word::long(
            self.regs
                .sp
                .wrapping_add(u32::from(locals))
                .wrapping_sub(u32::from(params)),
        );
        self.enter_frame(ret, locals)?;
        Ok(word::long(target.wrapping_add(2)))
    }

    fn ret(&mut self) -> Result<Addr, Fault> {
        let fp = self.regs.fp;
        let locals = self.mem.read(word::long(fp.wrapping_add(4)))?;
        let pc = self.read_width(Width::Long, fp)?;
        let prev =
            self.read_width(Width::Long, word::long(fp.wrapping_add(2)))?;
        self.regs.sp =
            word::long(fp.wrapping_sub(1).wrapping_sub(u32::from(locals)));
        self.regs.fp = prev;
        Ok(pc)
    }

    /// Executes a frame instruction, returning the new program counter
    ///
    /// `next` is the address of the following instruction.
    pub(crate) fn exec_frame(
        &mut self,
        op: FrameOp,
        next: Addr,
    ) -> Result<Addr, Fault> {
        match op {
            FrameOp::Call(target) => self.call(target, next),
            FrameOp::CallIndirect => {
                let target = self.pop_long()?;
                self.call(target, next)
            }
            FrameOp::Ret => self.ret(),
            FrameOp::Ret1 => {
                let v = self.pop()?;
                let pc = self.ret()?;
                self.push(v)?;
                Ok(pc)
            }
            FrameOp::Ret2 => {
                let v = self.pop_long()?;
                let pc = self.ret()?;
                self.push_long(v)?;
                Ok(pc)
            }
            FrameOp::LoadLocal(w, k) => {
                let addr = self.local_base()?.wrapping_add(u32::from(k));
                let v = self.read_width(w, word::long(addr))?;
                self.push_width(w, v)?;
                Ok(next)
            }
            FrameOp::StoreLocal(w, k) => {
                let addr = self.local_base()?.wrapping_add(u32::from(k));
                let v = self.pop_width(w)?;
                self.write_width(w, word::long(addr), v)?;
                Ok(next)
            }
            FrameOp::AddrLocal(k) => {
                let addr = self.local_base()?.wrapping_add(u32::from(k));
                self.push_long(word::long(addr))?;
                Ok(next)
            }
        }
    }
}
