use log::{debug, warn};
use std::{
    io::Read,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use twelve_vm::{Interrupt, InterruptLine, Word};

/// How often the forwarding thread checks whether the line has closed
const POLL: Duration = Duration::from_millis(50);

/// Spawns a worker thread that listens on `stdin` and emits bytes
///
/// The thread ends at end-of-file, on a read error, or once the receiver is
/// dropped and another byte arrives.
pub fn stdin_reader() -> mpsc::Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut i = std::io::stdin().lock();
        let mut buf = [0u8; 32];
        loop {
            let n = match i.read(&mut buf) {
                Ok(0) => {
                    debug!("stdin closed");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!("failed to read stdin: {e}");
                    return;
                }
            };
            for &c in &buf[..n] {
                if tx.send(c).is_err() {
                    return;
                }
            }
        }
    });
    rx
}

/// Posts a key-down interrupt for each byte received on `rx`
///
/// Returns when the sender hangs up or the line is closed.  A byte that
/// arrives while another interrupt is pending is dropped.
pub fn forward_keys(line: &InterruptLine, rx: mpsc::Receiver<u8>) {
    loop {
        match rx.recv_timeout(POLL) {
            Ok(c) => {
                if !line.request(Interrupt::key(Word::from(c), true)) {
                    debug!("dropped console byte {c:#04x}");
                }
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
        if line.is_closed() {
            return;
        }
    }
}

/// Spawns a thread that turns `stdin` bytes into keyboard interrupts
pub fn worker(line: Arc<InterruptLine>) -> JoinHandle<()> {
    let rx = stdin_reader();
    thread::spawn(move || {
        forward_keys(&line, rx);
        debug!("console worker exiting");
    })
}
