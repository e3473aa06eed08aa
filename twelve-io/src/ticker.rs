use log::debug;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use twelve_vm::{Interrupt, InterruptLine};

/// Spawns a thread that posts `irq` once per `period`
///
/// Ticks that land while another interrupt is pending are dropped (and
/// counted as missed by the line); the schedule does not drift to make up
/// for them.  The thread exits after the line is closed.
pub fn spawn_ticker(
    line: Arc<InterruptLine>,
    irq: Interrupt,
    period: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("starting {:?} ticker every {period:?}", irq.kind());
        let mut next = Instant::now() + period;
        while !line.is_closed() {
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }
            next += period;
            line.request(irq);
        }
        debug!("{:?} ticker exiting", irq.kind());
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use twelve_vm::IrqKind;

    #[test]
    fn ticks_until_closed() {
        let line = Arc::new(InterruptLine::new());
        line.set_enabled(true);
        let period = Duration::from_millis(1);
        let h = spawn_ticker(line.clone(), Interrupt::timer(), period);

        // Nobody takes the pending tick, so later ticks are missed
        while line.missed() < 2 {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(line.pending(), Some(IrqKind::Timer));

        line.close();
        h.join().unwrap();
    }
}
