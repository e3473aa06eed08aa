//! Interrupt controller
//!
//! The [`InterruptLine`] is the only state shared between the execution
//! thread and host threads (timers, input, display refresh).  It holds a
//! single pending-interrupt slot; a request made while the slot is full is
//! dropped and counted as missed.
use crate::{
    memory::Layout,
    word::{Addr, Word},
};
use log::debug;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// ROM offset of the program entry point
pub const ENTRY_OFFSET: u32 = 0x020;

/// Maximum number of argument words carried by an interrupt
pub const MAX_ARGS: usize = 3;

/// Interrupt source
///
/// The discriminant of each kind is its handler's offset from the start of
/// ROM, not an absolute address: handlers are relocated by
/// [`Layout::rom_base`], so the timer handler runs at `rom_base + 0x004`.
/// Absolute addresses this low fall in the RAM frame header.  `Stop` has no
/// handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IrqKind {
    /// Stops the execution loop
    Stop = 0x000,
    /// Periodic timer tick
    Timer = 0x004,
    /// Display refresh
    VBlank = 0x008,
    /// Key event, with `[code, state]` arguments
    Keyboard = 0x00C,
    /// Mouse event, with `[x, y, buttons]` arguments
    Mouse = 0x010,
}

impl IrqKind {
    /// Returns the absolute handler address for this interrupt kind
    pub fn vector(self, layout: &Layout) -> Option<Addr> {
        match self {
            IrqKind::Stop => None,
            k => Some(layout.rom_base() + k as u32),
        }
    }
}

/// An interrupt request: a kind plus up to [`MAX_ARGS`] argument words
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interrupt {
    kind: IrqKind,
    args: [Word; MAX_ARGS],
    argc: u8,
}

impl Interrupt {
    /// Builds an interrupt with the given arguments
    ///
    /// Arguments past [`MAX_ARGS`] are ignored.
    pub fn new(kind: IrqKind, args: &[Word]) -> Self {
        let argc = args.len().min(MAX_ARGS);
        let mut out = Self {
            kind,
            args: [0; MAX_ARGS],
            argc: argc as u8,
        };
        out.args[..argc].copy_from_slice(&args[..argc]);
        out
    }

    /// Timer tick
    pub fn timer() -> Self {
        Self::new(IrqKind::Timer, &[])
    }

    /// Display refresh
    pub fn vblank() -> Self {
        Self::new(IrqKind::VBlank, &[])
    }

    /// Key press or release
    pub fn key(code: Word, down: bool) -> Self {
        Self::new(IrqKind::Keyboard, &[code, Word::from(down)])
    }

    /// Mouse position and button state
    pub fn mouse(x: Word, y: Word, buttons: Word) -> Self {
        Self::new(IrqKind::Mouse, &[x, y, buttons])
    }

    /// Request to end the execution loop
    pub fn stop() -> Self {
        Self::new(IrqKind::Stop, &[])
    }

    /// Returns the interrupt kind
    pub fn kind(&self) -> IrqKind {
        self.kind
    }

    /// Returns the argument words, in push order
    pub fn args(&self) -> &[Word] {
        &self.args[..usize::from(self.argc)]
    }
}

#[derive(Default)]
struct LineState {
    enabled: bool,
    closed: bool,
    pending: Option<Interrupt>,
    missed: u64,
}

/// Single-slot interrupt queue shared between threads
#[derive(Default)]
pub struct InterruptLine {
    state: Mutex<LineState>,
    wake: Condvar,
}

impl InterruptLine {
    /// Builds a new line with interrupts disabled and nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Posts an interrupt
    ///
    /// Succeeds if interrupts are enabled and no interrupt is pending; a
    /// successful request wakes a halted CPU.  On failure, the missed
    /// counter is incremented and the interrupt is discarded.
    ///
    /// `Stop` is no exception; to end a program that runs with interrupts
    /// disabled, [`close`](Self::close) the line instead.
    pub fn request(&self, irq: Interrupt) -> bool {
        let mut s = self.state();
        if s.closed || !s.enabled || s.pending.is_some() {
            s.missed += 1;
            debug!("missed {:?} interrupt ({} total)", irq.kind, s.missed);
            return false;
        }
        s.pending = Some(irq);
        self.wake.notify_all();
        true
    }

    /// Takes the pending interrupt, if any
    pub(crate) fn take(&self) -> Option<Interrupt> {
        self.state().pending.take()
    }

    /// Blocks until an interrupt is pending
    ///
    /// Returns `false` if the line was closed instead.
    pub(crate) fn wait(&self) -> bool {
        let s = self
            .wake
            .wait_while(self.state(), |s| s.pending.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        s.pending.is_some()
    }

    /// Enables or disables interrupt requests
    pub fn set_enabled(&self, enabled: bool) {
        self.state().enabled = enabled;
    }

    /// Checks whether interrupt requests are accepted
    pub fn enabled(&self) -> bool {
        self.state().enabled
    }

    /// Returns the kind of the pending interrupt, without taking it
    pub fn pending(&self) -> Option<IrqKind> {
        self.state().pending.map(|i| i.kind)
    }

    /// Returns the number of dropped requests
    pub fn missed(&self) -> u64 {
        self.state().missed
    }

    /// Closes the line, rejecting all future requests and waking any waiter
    ///
    /// Host threads poll [`InterruptLine::is_closed`] to know when to exit.
    pub fn close(&self) {
        self.state().closed = true;
        self.wake.notify_all();
    }

    /// Checks whether the line has been closed
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Clears the pending slot and missed counter, and disables interrupts
    pub(crate) fn reset(&self) {
        let mut s = self.state();
        s.enabled = false;
        s.pending = None;
        s.missed = 0;
    }
}
