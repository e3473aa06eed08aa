//! 12VM virtual machine
//!
//! The 12VM is a stack machine with 12-bit words and a 24-bit address space.
//! A [`Vm`] owns its [`Memory`] and registers and is driven by a single
//! thread; other threads interact with it only through its shared
//! [`InterruptLine`].
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod alu;
mod error;
pub mod frame;
pub mod image;
pub mod irq;
pub mod isa;
pub mod jump;
pub mod memory;
pub mod observer;
pub mod stack;
pub mod word;

pub use error::{Fault, LoadError, Trap};
pub use irq::{Interrupt, InterruptLine, IrqKind};
pub use isa::{Instruction, Opcode};
pub use memory::{Layout, Memory, Region};
pub use observer::{Breakpoints, Flow, Observer, Profiler};
pub use word::{Addr, Long, Width, Word};

use isa::SystemOp;
use log::{debug, info, log_enabled, trace, Level};
use std::sync::Arc;

/// CPU registers
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    /// Address of the next instruction
    pub pc: Addr,
    /// Address of the highest occupied stack slot
    pub sp: Addr,
    /// Address of the current frame header
    pub fp: Addr,
    /// Carry flag
    pub carry: bool,
}

/// Execution counters
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Instructions retired
    pub instructions: u64,
    /// Interrupts delivered (not counting `Stop`)
    pub interrupts: u64,
    /// Highest stack address written by a push
    pub stack_high_water: Addr,
}

/// Reason for leaving [`Vm::run`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// `hlt` executed with interrupts disabled
    Halted,
    /// A `Stop` interrupt was delivered, or the interrupt line was closed
    Stopped,
    /// An observer asked to stop before the instruction at this address
    Break(Addr),
}

/// The virtual machine
pub struct Vm {
    mem: Memory,
    regs: Registers,
    halted: bool,
    irq: Arc<InterruptLine>,
    stats: Stats,
}

impl Vm {
    /// Builds a machine with zeroed memory, reset to the default entry point
    pub fn new(layout: Layout) -> Self {
        let mut vm = Self {
            mem: Memory::new(layout),
            regs: Registers::default(),
            halted: false,
            irq: Arc::new(InterruptLine::new()),
            stats: Stats::default(),
        };
        vm.reset(vm.default_entry());
        vm
    }

    /// Copies a program image into ROM
    ///
    /// Returns the number of words loaded.  On error, blocks before the
    /// failing one have already been written.
    pub fn load_image(&mut self, data: &[u8]) -> Result<usize, LoadError> {
        let mut total = 0;
        for b in image::parse(data)? {
            debug!(
                "loading {} words at ROM offset {:#x}",
                b.words.len(),
                b.offset
            );
            self.mem.load_rom(i64::from(b.offset), &b.words)?;
            total += b.words.len();
        }
        Ok(total)
    }

    /// Address of the default entry point, [`irq::ENTRY_OFFSET`] words into
    /// ROM
    pub fn default_entry(&self) -> Addr {
        self.mem.layout().rom_base() + irq::ENTRY_OFFSET
    }

    /// Resets the machine to begin execution at `entry`
    ///
    /// Writable memory is zeroed, which leaves an empty frame header at
    /// addresses `0..=4`; `fp` points at it and `sp` at its last word.
    /// Interrupts are disabled and any pending request is discarded.
    pub fn reset(&mut self, entry: Addr) {
        self.mem.clear_writable();
        self.regs = Registers {
            pc: word::long(entry),
            sp: frame::HEADER_SIZE - 1,
            fp: 0,
            carry: false,
        };
        self.halted = false;
        self.stats = Stats::default();
        self.irq.reset();
    }

    /// Returns the current register values
    #[inline]
    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    /// Checks whether the machine is halted
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Shared borrow of memory
    #[inline]
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Mutable borrow of memory, e.g. for host-side setup
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Returns execution counters
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Returns a handle to the interrupt line, for use by other threads
    pub fn interrupt_line(&self) -> Arc<InterruptLine> {
        self.irq.clone()
    }

    /// Shorthand for `self.interrupt_line().request(irq)`
    pub fn request(&self, irq: Interrupt) -> bool {
        self.irq.request(irq)
    }

    /// Runs until the machine exits or faults
    pub fn run<O: Observer>(&mut self, obs: &mut O) -> Result<Exit, Trap> {
        loop {
            if let Some(e) = self.step(obs)? {
                return Ok(e);
            }
        }
    }

    /// Runs a single iteration of the execution loop
    ///
    /// A closed interrupt line ends the loop.  Otherwise a pending interrupt
    /// is delivered first, then the instruction at `pc` is executed.  Returns
    /// `Some(..)` if the loop should end.
    pub fn step<O: Observer>(
        &mut self,
        obs: &mut O,
    ) -> Result<Option<Exit>, Trap> {
        if self.irq.is_closed() {
            info!("interrupt line closed at {:#08x}", self.regs.pc);
            return Ok(Some(Exit::Stopped));
        }
        if let Some(irq) = self.irq.take() {
            if irq.kind() == IrqKind::Stop {
                info!("stopped at {:#08x}", self.regs.pc);
                return Ok(Some(Exit::Stopped));
            }
            let pc = self.regs.pc;
            self.deliver(&irq).map_err(|fault| Trap { pc, fault })?;
            obs.interrupt(self, &irq);
        }

        let pc = self.regs.pc;
        if obs.before_fetch(self) == Flow::Break {
            return Ok(Some(Exit::Break(pc)));
        }
        let trap = move |fault| Trap { pc, fault };
        let mem = &self.mem;
        let i =
            Instruction::decode(|n| mem.read(word::long(pc.wrapping_add(n))))
                .map_err(trap)?;
        if log_enabled!(Level::Trace) {
            let r = &self.regs;
            trace!("{pc:06x}: {i} sp={:06x} fp={:06x}", r.sp, r.fp);
        }
        let next = word::long(pc.wrapping_add(i.width()));
        let out = self.execute(i, next).map_err(trap)?;
        self.stats.instructions += 1;
        obs.executed(self, &i);
        Ok(out)
    }

    fn execute(
        &mut self,
        i: Instruction,
        next: Addr,
    ) -> Result<Option<Exit>, Fault> {
        let pc = match i {
            Instruction::System(op) => {
                self.regs.pc = next;
                return Ok(self.exec_system(op));
            }
            Instruction::Stack(op) => {
                self.exec_stack(op)?;
                next
            }
            Instruction::Memory(op) => {
                self.exec_mem(op)?;
                next
            }
            Instruction::Frame(op) => self.exec_frame(op, next)?,
            Instruction::Jump(j) => self.exec_jump(j, next)?,
            Instruction::Alu(op) => {
                self.exec_alu(op)?;
                next
            }
        };
        self.regs.pc = pc;
        Ok(None)
    }

    fn exec_system(&mut self, op: SystemOp) -> Option<Exit> {
        match op {
            SystemOp::Nop => (),
            SystemOp::EnableInterrupts => self.irq.set_enabled(true),
            SystemOp::DisableInterrupts => self.irq.set_enabled(false),
            SystemOp::Halt => {
                self.halted = true;
                if !self.irq.enabled() {
                    info!("halted with interrupts disabled");
                    return Some(Exit::Halted);
                }
                let woken = self.irq.wait();
                self.halted = false;
                if !woken {
                    info!("interrupt line closed while halted");
                    return Some(Exit::Stopped);
                }
            }
        }
        None
    }

    /// Pushes the interrupt's arguments and a frame header, then jumps to
    /// its vector
    fn deliver(&mut self, irq: &Interrupt) -> Result<(), Fault> {
        let Some(vector) = irq.kind().vector(self.mem.layout()) else {
            return Ok(());
        };
        for &a in irq.args() {
            self.push(a)?;
        }
        let ret = self.regs.pc;
        self.enter_frame(ret, irq.args().len() as Word)?;
        self.regs.pc = vector;
        self.stats.interrupts += 1;
        debug!("delivered {:?} interrupt, returning to {ret:#08x}", irq.kind());
        Ok(())
    }
}
