//! Host-side peripherals for the 12VM
//!
//! Each peripheral runs on its own thread and talks to the machine only by
//! posting interrupts to its [`InterruptLine`](twelve_vm::InterruptLine).
//! Threads exit once the line is closed.
#![warn(missing_docs)]

mod console;
mod screen;
mod ticker;

pub use console::{forward_keys, stdin_reader, worker as console_worker};
pub use screen::Frame;
pub use ticker::spawn_ticker;
