use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use twelve_vm::{
    alu::{AluOp, BinOp, UnOp},
    frame::FrameOp,
    isa::{Instruction as I, SystemOp},
    jump::{Jump, Mode},
    stack::StackOp,
    Exit, Layout, Vm, Width, Word,
};

/// Recursive `fib(n)`, as a routine at the start of ROM
fn fib_routine(base: u32) -> Vec<Word> {
    let n = I::Frame(FrameOp::LoadLocal(Width::Word, 0));
    let two = I::Stack(StackOp::Push(2));
    let sub = I::Alu(AluOp::Binary(BinOp::Sub, Width::Word));
    let call = I::Frame(FrameOp::Call(base));
    let prog = [
        n,
        two,
        sub,
        I::Jump(Jump {
            mode: Mode::Less,
            target: base + 27,
        }),
        n,
        I::Alu(AluOp::Unary(UnOp::Dec, Width::Word)),
        call,
        n,
        two,
        sub,
        call,
        I::Alu(AluOp::Binary(BinOp::Add, Width::Word)),
        I::Frame(FrameOp::Ret1),
        n,
        I::Frame(FrameOp::Ret1),
    ];
    let mut out = vec![1, 1];
    for i in prog {
        i.encode(&mut out);
    }
    out
}

fn fib(vm: &mut Vm, n: Word) -> Word {
    let entry = vm.default_entry();
    vm.reset(entry);
    let base = vm.memory().layout().rom_base();
    let mut main = vec![];
    I::Stack(StackOp::Push(n)).encode(&mut main);
    I::Frame(FrameOp::Call(base)).encode(&mut main);
    I::System(SystemOp::Halt).encode(&mut main);
    vm.memory_mut().load_rom(0x20, &main).unwrap();
    assert_eq!(vm.run(&mut ()), Ok(Exit::Halted));
    vm.memory().read(5).unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut vm = Vm::new(Layout::new(0x1000, 0, 0, 0x100).unwrap());
    let base = vm.memory().layout().rom_base();
    vm.memory_mut().load_rom(0, &fib_routine(base)).unwrap();
    assert_eq!(fib(&mut vm, 10), 55);

    let mut g = c.benchmark_group("fibonacci");
    g.bench_function("fib(15)", |b| {
        b.iter(|| fib(&mut vm, black_box(15)))
    });
    g.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
