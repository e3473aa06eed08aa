use std::path::PathBuf;
use std::time::{Duration, Instant};

use twelve_io::{console_worker, spawn_ticker, Frame};
use twelve_vm::{
    memory::{
        DEFAULT_GRAM_SIZE, DEFAULT_RAM_SIZE, DEFAULT_ROM_SIZE,
        DEFAULT_VRAM_SIZE,
    },
    Addr, Breakpoints, Exit, Interrupt, Layout, Profiler, Vm,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;

fn parse_hex(s: &str) -> Result<Addr, std::num::ParseIntError> {
    let s = s.trim_start_matches("0x");
    u32::from_str_radix(s, 16)
}

/// 12VM runner
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Program image to load and execute
    image: PathBuf,

    /// Entry point, as a hex address (defaults to 0x20 words into ROM)
    #[clap(long, value_parser = parse_hex)]
    entry: Option<Addr>,

    /// RAM size, in words
    #[clap(long, default_value_t = DEFAULT_RAM_SIZE)]
    ram: u32,

    /// Graphics register block size, in words
    #[clap(long, default_value_t = DEFAULT_GRAM_SIZE)]
    gram: u32,

    /// Video RAM size, in words
    #[clap(long, default_value_t = DEFAULT_VRAM_SIZE)]
    vram: u32,

    /// ROM size, in words
    #[clap(long, default_value_t = DEFAULT_ROM_SIZE)]
    rom: u32,

    /// Timer interrupt period in milliseconds (0 to disable)
    #[clap(long, default_value_t = 10)]
    timer_ms: u64,

    /// Display refresh interrupt rate in Hz (0 to disable)
    #[clap(long, default_value_t = 60)]
    vblank_hz: u32,

    /// Don't forward stdin as keyboard interrupts
    #[clap(long)]
    no_console: bool,

    /// Break at the given hex address, print registers, and continue
    #[clap(long = "break", value_parser = parse_hex)]
    breakpoints: Vec<Addr>,

    /// Print the most frequently executed opcodes on exit
    #[clap(long)]
    profile: bool,

    /// Save video RAM as a PNG on exit
    #[clap(long)]
    screenshot: Option<PathBuf>,

    /// Screen width in pixels, used with `--screenshot`
    #[clap(long, default_value_t = 320)]
    width: u32,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("TWELVE_LOG", "info")
        .write_style_or("TWELVE_LOG", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();
    let data = std::fs::read(&args.image)
        .with_context(|| format!("failed to read {:?}", args.image))?;

    let layout = Layout::new(args.ram, args.gram, args.vram, args.rom)
        .context("invalid memory layout")?;
    let mut vm = Vm::new(layout);
    let n = vm
        .load_image(&data)
        .with_context(|| format!("failed to load {:?}", args.image))?;
    let entry = args.entry.unwrap_or_else(|| vm.default_entry());
    vm.reset(entry);
    info!("loaded {n} words, starting at {entry:#08x}");

    let line = vm.interrupt_line();
    let mut workers = vec![];
    if args.timer_ms > 0 {
        let period = Duration::from_millis(args.timer_ms);
        workers.push(spawn_ticker(line.clone(), Interrupt::timer(), period));
    }
    if args.vblank_hz > 0 {
        let period = Duration::from_secs(1) / args.vblank_hz;
        workers.push(spawn_ticker(line.clone(), Interrupt::vblank(), period));
    }
    if !args.no_console {
        workers.push(console_worker(line.clone()));
    }

    let mut breakpoints: Breakpoints =
        args.breakpoints.iter().copied().collect();
    let mut profiler = Profiler::new();
    let start = Instant::now();
    let exit = loop {
        match vm.run(&mut (&mut breakpoints, &mut profiler)) {
            Ok(Exit::Break(pc)) => {
                let r = vm.regs();
                info!(
                    "break at {pc:#08x}: sp = {:#08x}, fp = {:#08x}, \
                     carry = {}",
                    r.sp,
                    r.fp,
                    r.carry
                );
            }
            e => break e,
        }
    };

    // Retire the peripheral threads before reporting
    line.close();
    for w in workers {
        w.join().map_err(|_| anyhow!("peripheral thread panicked"))?;
    }

    let stats = vm.stats();
    info!(
        "{} instructions and {} interrupts ({} missed) in {:?}",
        stats.instructions,
        stats.interrupts,
        line.missed(),
        start.elapsed()
    );
    if args.profile {
        for (op, count) in profiler.top(16) {
            println!("{:>14} {count}", op.mnemonic());
        }
    }
    if let Some(path) = &args.screenshot {
        Frame::capture(vm.memory(), args.width)
            .save_png(path)
            .with_context(|| format!("failed to save {path:?}"))?;
    }

    let exit = exit.context("execution failed")?;
    info!("exited: {exit:?}");
    Ok(())
}
