use std::{thread, time::Duration};
use twelve_vm::{
    image::{self, Block},
    jump::Mode,
    Exit, Fault, Interrupt, Layout, Opcode, Trap, Vm, Word,
};

const ROM_BASE: u32 = 0x1100;
const ENTRY: u32 = ROM_BASE + 0x20;

fn layout() -> Layout {
    Layout::new(0x1000, 0, 0x100, 0x1000).unwrap()
}

/// Assembles whitespace-separated tokens
///
/// A token is an opcode mnemonic, a jump mnemonic (which expands to `jmp`
/// plus its mode word), a three-digit hex word, or a six-digit hex long.
fn asm(s: &str) -> Vec<Word> {
    let modes: Vec<Mode> = (0..)
        .map_while(|v: Word| Mode::try_from(v).ok())
        .collect();
    let mut out = vec![];
    for t in s.split_whitespace() {
        if let Some(m) = modes.iter().find(|m| m.mnemonic() == t) {
            out.extend([Opcode::Jmp as Word, *m as Word]);
        } else if let Some(op) = Opcode::from_mnemonic(t) {
            out.push(op as Word);
        } else {
            let v = u32::from_str_radix(t, 16).unwrap();
            match t.len() {
                3 => out.push(v as Word),
                6 => out.extend([(v >> 12) as Word, (v & 0xFFF) as Word]),
                _ => panic!("invalid literal {t:?}"),
            }
        }
    }
    out
}

/// Builds a machine from `(ROM offset, source)` blocks, via the image format
fn load(blocks: &[(i32, &str)]) -> Vm {
    let blocks: Vec<Block> = blocks
        .iter()
        .map(|&(offset, src)| Block {
            offset,
            words: asm(src),
        })
        .collect();
    let mut vm = Vm::new(layout());
    vm.load_image(&image::to_bytes(&blocks)).unwrap();
    vm.reset(vm.default_entry());
    vm
}

fn stack(vm: &Vm) -> &[Word] {
    &vm.memory().words()[5..=vm.regs().sp as usize]
}

#[test]
fn add_two_params() {
    let mut vm = load(&[
        (0x20, "push 003 push 004 call 001200 hlt"),
        (0x100, "002 002 load_local 000 load_local 001 add ret1"),
    ]);
    assert_eq!(vm.regs().pc, ENTRY);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(stack(&vm), &[7]);
    assert_eq!(vm.regs().fp, 0);
    assert_eq!(vm.regs().pc, ENTRY + 8);
}

#[test]
fn carry_on_add_overflow() {
    let mut vm = load(&[(0x20, "push 800 push 800 add hlt")]);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(stack(&vm), &[0]);
    assert!(vm.regs().carry);
}

#[test]
fn add_l_overflow() {
    let mut vm = load(&[(0x20, "push_l ffffff push_l 000001 add_l hlt")]);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(stack(&vm), &[0, 0]);
    assert!(vm.regs().carry);
}

#[test]
fn long_composition() {
    let mut vm = load(&[(
        0x20,
        "push 001 push fff store_l 000100 load_l 000100 hlt",
    )]);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(&vm.memory().words()[0x100..0x102], &[0x001, 0xFFF]);
    assert_eq!(stack(&vm), &[0x001, 0xFFF]);
}

#[test]
fn ret1_preserves_top_word() {
    let mut vm = load(&[
        (0x20, "push 111 push 222 call 001200 hlt"),
        (0x100, "001 003 push abc ret1"),
    ]);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(stack(&vm), &[0x111, 0xABC]);
}

#[test]
fn jz_not_taken() {
    let mut vm = load(&[(0x20, "push 001 jz 001200 push aaa hlt")]);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(stack(&vm), &[0xAAA]);
    assert_eq!(vm.regs().pc, ENTRY + 9);
}

#[test]
fn rom_write_traps() {
    let mut vm = load(&[(0x20, "push 005 store 001100 hlt")]);
    assert_eq!(
        vm.run(&mut ()),
        Err(Trap {
            pc: ENTRY + 2,
            fault: Fault::RomWrite { addr: ROM_BASE }
        })
    );
    assert_eq!(vm.memory().read(ROM_BASE), Ok(0));
    assert_eq!(vm.regs().pc, ENTRY + 2);
}

#[test]
fn divide_by_zero_traps() {
    let mut vm = load(&[(0x20, "push 005 push 000 div hlt")]);
    assert_eq!(
        vm.run(&mut ()),
        Err(Trap {
            pc: ENTRY + 4,
            fault: Fault::DivideByZero
        })
    );
}

#[test]
fn recursive_fibonacci() {
    let mut vm = load(&[
        (0x20, "push 00a call 001200 hlt"),
        (
            0x100,
            "001 001
             load_local 000 push 002 sub jlz 00121b
             load_local 000 dec call 001200
             load_local 000 push 002 sub call 001200
             add ret1
             load_local 000 ret1",
        ),
    ]);
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(stack(&vm), &[55]);
}

#[test]
fn missed_interrupts_are_counted() {
    let mut vm = load(&[(0x20, "ei hlt")]);
    vm.step(&mut ()).unwrap();
    assert!(vm.request(Interrupt::timer()));
    assert!(!vm.request(Interrupt::vblank()));
    assert_eq!(vm.interrupt_line().missed(), 1);
}

#[test]
fn timer_wakes_halt() {
    // The timer vector jumps to a handler at ROM offset 0x80, which bumps a
    // counter at 0x800 and halts for good once it reaches 3.
    let mut vm = load(&[
        (0x04, "jmp 001180"),
        (0x20, "ei hlt jmp 001121"),
        (
            0x80,
            "di load 000800 inc dup store 000800 push 003 jeq 001191 ei ret
             hlt",
        ),
    ]);
    let line = vm.interrupt_line();
    let h = thread::spawn(move || {
        for _ in 0..3 {
            while !line.request(Interrupt::timer()) {
                thread::sleep(Duration::from_millis(1));
            }
        }
    });
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    h.join().unwrap();
    assert_eq!(vm.memory().read(0x800), Ok(3));
    assert_eq!(vm.stats().interrupts, 3);
    assert_eq!(vm.regs().pc, 0x1192);
}

#[test]
fn stop_while_halted() {
    let mut vm = load(&[(0x20, "ei hlt")]);
    let line = vm.interrupt_line();
    let h = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        assert!(line.request(Interrupt::stop()));
    });
    assert_eq!(vm.run(&mut ()), Ok(Exit::Stopped));
    h.join().unwrap();
}

#[test]
fn close_while_halted() {
    let mut vm = load(&[(0x20, "ei hlt")]);
    let line = vm.interrupt_line();
    let h = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        line.close();
    });
    assert_eq!(vm.run(&mut ()), Ok(Exit::Stopped));
    h.join().unwrap();
}

#[test]
fn keyboard_arguments() {
    // Handler stores both arguments, then stops the machine by halting with
    // interrupts disabled
    let mut vm = load(&[
        (0x0C, "jmp 001180"),
        (0x20, "ei hlt"),
        (
            0x80,
            "load_local 000 store 000800 load_local 001 store 000801 di hlt",
        ),
    ]);
    assert!(!vm.request(Interrupt::key(0x41, true)));
    vm.step(&mut ()).unwrap();
    assert!(vm.request(Interrupt::key(0x41, true)));
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    assert_eq!(&vm.memory().words()[0x800..0x802], &[0x41, 1]);
}
