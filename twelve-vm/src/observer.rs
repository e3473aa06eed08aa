//! Hooks for debuggers and profilers
use crate::{
    irq::Interrupt,
    isa::{Instruction, Opcode},
    word::Addr,
    Vm,
};
use std::collections::{HashMap, HashSet};

/// Decision returned by [`Observer::before_fetch`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Execute the next instruction
    Continue,
    /// Stop before executing it
    Break,
}

/// Watches execution without modifying it
///
/// Every method has an empty default implementation, and `()` is the
/// observer that does nothing.
pub trait Observer {
    /// Called before each fetch, with `vm.regs().pc` pointing at the
    /// instruction about to run
    fn before_fetch(&mut self, _vm: &Vm) -> Flow {
        Flow::Continue
    }

    /// Called after an instruction completes successfully
    fn executed(&mut self, _vm: &Vm, _i: &Instruction) {}

    /// Called after an interrupt is delivered, with `pc` at its vector
    fn interrupt(&mut self, _vm: &Vm, _irq: &Interrupt) {}
}

impl Observer for () {}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn before_fetch(&mut self, vm: &Vm) -> Flow {
        match (self.0.before_fetch(vm), self.1.before_fetch(vm)) {
            (Flow::Continue, Flow::Continue) => Flow::Continue,
            _ => Flow::Break,
        }
    }

    fn executed(&mut self, vm: &Vm, i: &Instruction) {
        self.0.executed(vm, i);
        self.1.executed(vm, i);
    }

    fn interrupt(&mut self, vm: &Vm, irq: &Interrupt) {
        self.0.interrupt(vm, irq);
        self.1.interrupt(vm, irq);
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn before_fetch(&mut self, vm: &Vm) -> Flow {
        (**self).before_fetch(vm)
    }
    fn executed(&mut self, vm: &Vm, i: &Instruction) {
        (**self).executed(vm, i)
    }
    fn interrupt(&mut self, vm: &Vm, irq: &Interrupt) {
        (**self).interrupt(vm, irq)
    }
}

/// Stops execution at a set of addresses
///
/// After a break, running again resumes past the breakpoint instead of
/// stopping on it immediately.
#[derive(Debug, Default)]
pub struct Breakpoints {
    addrs: HashSet<Addr>,
    resume: Option<Addr>,
}

impl Breakpoints {
    /// Builds an empty breakpoint set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a breakpoint
    pub fn insert(&mut self, addr: Addr) {
        self.addrs.insert(addr);
    }

    /// Removes a breakpoint, returning whether it was present
    pub fn remove(&mut self, addr: Addr) -> bool {
        self.addrs.remove(&addr)
    }

    /// Checks whether a breakpoint is set at `addr`
    pub fn contains(&self, addr: Addr) -> bool {
        self.addrs.contains(&addr)
    }
}

impl FromIterator<Addr> for Breakpoints {
    fn from_iter<I: IntoIterator<Item = Addr>>(iter: I) -> Self {
        Self {
            addrs: iter.into_iter().collect(),
            resume: None,
        }
    }
}

impl Observer for Breakpoints {
    fn before_fetch(&mut self, vm: &Vm) -> Flow {
        let pc = vm.regs().pc;
        if self.resume.take() == Some(pc) || !self.addrs.contains(&pc) {
            Flow::Continue
        } else {
            self.resume = Some(pc);
            Flow::Break
        }
    }
}

/// Counts executed instructions by opcode
#[derive(Debug, Default)]
pub struct Profiler {
    counts: HashMap<Opcode, u64>,
}

impl Profiler {
    /// Builds an empty profiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times an opcode has executed
    pub fn count(&self, op: Opcode) -> u64 {
        self.counts.get(&op).copied().unwrap_or(0)
    }

    /// Returns the `n` most frequent opcodes, most frequent first
    ///
    /// Ties are broken by opcode value.
    pub fn top(&self, n: usize) -> Vec<(Opcode, u64)> {
        let mut out: Vec<_> =
            self.counts.iter().map(|(&k, &v)| (k, v)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out.truncate(n);
        out
    }
}

impl Observer for Profiler {
    fn executed(&mut self, _vm: &Vm, i: &Instruction) {
        *self.counts.entry(i.opcode()).or_default() += 1;
    }
}
