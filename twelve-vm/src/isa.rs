//! Instruction set: opcode table, decoding and encoding
use crate::{
    alu::{AluOp, BinOp, UnOp},
    error::Fault,
    frame::FrameOp,
    jump::{Jump, Mode},
    stack::{MemOp, StackOp},
    word::{
        self, Addr, Long,
        Width::{Long as L, Word as W},
        Word,
    },
};
use std::fmt;

macro_rules! opcodes {
    ($($name:ident = $value:literal, $mnemonic:literal;)*) => {
        /// Numeric opcode, as stored in the first word of an instruction
        ///
        /// Variants are named after their assembler mnemonics; see
        /// [`Opcode::mnemonic`].
        #[allow(missing_docs)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum Opcode {
            $($name = $value,)*
        }

        impl Opcode {
            /// Every opcode, in numeric order
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name,)*];

            /// Returns the assembler mnemonic
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic,)*
                }
            }
        }

        impl TryFrom<Word> for Opcode {
            type Error = Word;
            fn try_from(w: Word) -> Result<Self, Word> {
                match w {
                    $($value => Ok(Opcode::$name),)*
                    _ => Err(w),
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x000, "nop";
    Hlt = 0x001, "hlt";
    Ei = 0x002, "ei";
    Di = 0x003, "di";

    Push = 0x010, "push";
    PushL = 0x011, "push_l";
    Pop = 0x012, "pop";
    PopL = 0x013, "pop_l";
    Dup = 0x014, "dup";
    DupL = 0x015, "dup_l";
    Swap = 0x016, "swap";
    SwapL = 0x017, "swap_l";
    Over = 0x018, "over";

    Load = 0x020, "load";
    LoadL = 0x021, "load_l";
    Store = 0x022, "store";
    StoreL = 0x023, "store_l";
    LoadI = 0x024, "loadi";
    LoadIL = 0x025, "loadi_l";
    StoreI = 0x026, "storei";
    StoreIL = 0x027, "storei_l";
    Memc = 0x028, "memc";

    Call = 0x030, "call";
    CallI = 0x031, "calli";
    Ret = 0x032, "ret";
    Ret1 = 0x033, "ret1";
    Ret2 = 0x034, "ret2";
    LoadLocal = 0x035, "load_local";
    LoadLocalL = 0x036, "load_local_l";
    StoreLocal = 0x037, "store_local";
    StoreLocalL = 0x038, "store_local_l";
    AddrLocal = 0x039, "addr_local";

    Jmp = 0x040, "jmp";

    Add = 0x050, "add";
    Sub = 0x051, "sub";
    Mul = 0x052, "mul";
    Mul2 = 0x053, "mul2";
    Div = 0x054, "div";
    Mod = 0x055, "mod";
    Neg = 0x056, "neg";
    Not = 0x057, "not";
    Inc = 0x058, "inc";
    Dec = 0x059, "dec";
    Or = 0x05A, "or";
    Xor = 0x05B, "xor";
    And = 0x05C, "and";
    Shl = 0x05D, "shl";
    Shr = 0x05E, "shr";
    Sar = 0x05F, "sar";
    RotLC = 0x060, "rot_l_c";
    RotRC = 0x061, "rot_r_c";

    AddL = 0x070, "add_l";
    SubL = 0x071, "sub_l";
    MulL = 0x072, "mul_l";
    DivL = 0x073, "div_l";
    ModL = 0x074, "mod_l";
    NegL = 0x075, "neg_l";
    NotL = 0x076, "not_l";
    IncL = 0x077, "inc_l";
    DecL = 0x078, "dec_l";
    OrL = 0x079, "or_l";
    XorL = 0x07A, "xor_l";
    AndL = 0x07B, "and_l";
    ShlL = 0x07C, "shl_l";
    ShrL = 0x07D, "shr_l";
    SarL = 0x07E, "sar_l";
    RotLCL = 0x07F, "rot_l_c_l";
    RotRCL = 0x080, "rot_r_c_l";

    W2l = 0x090, "w2l";
    Sw2l = 0x091, "sw2l";
    L2w = 0x092, "l2w";
}

impl Opcode {
    /// Looks up an opcode by its mnemonic
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.mnemonic() == s)
    }
}

/// Builds both directions of the opcode to ALU operation mapping from one
/// table.  The reverse match is exhaustive over [`AluOp`].
macro_rules! alu_ops {
    ($($name:ident => ($($op:tt)+),)*) => {
        impl Opcode {
            /// Returns the ALU operation for this opcode, if it is one
            fn alu(self) -> Option<AluOp> {
                match self {
                    $(Opcode::$name => Some($($op)+),)*
                    _ => None,
                }
            }
        }

        impl AluOp {
            /// Returns the opcode that encodes this operation
            pub fn opcode(self) -> Opcode {
                match self {
                    $($($op)+ => Opcode::$name,)*
                }
            }
        }
    };
}

alu_ops! {
    Add => (AluOp::Binary(BinOp::Add, W)),
    Sub => (AluOp::Binary(BinOp::Sub, W)),
    Mul => (AluOp::Binary(BinOp::Mul, W)),
    Mul2 => (AluOp::Mul2),
    Div => (AluOp::Binary(BinOp::Div, W)),
    Mod => (AluOp::Binary(BinOp::Mod, W)),
    Neg => (AluOp::Unary(UnOp::Neg, W)),
    Not => (AluOp::Unary(UnOp::Not, W)),
    Inc => (AluOp::Unary(UnOp::Inc, W)),
    Dec => (AluOp::Unary(UnOp::Dec, W)),
    Or => (AluOp::Binary(BinOp::Or, W)),
    Xor => (AluOp::Binary(BinOp::Xor, W)),
    And => (AluOp::Binary(BinOp::And, W)),
    Shl => (AluOp::Unary(UnOp::Shl, W)),
    Shr => (AluOp::Unary(UnOp::Shr, W)),
    Sar => (AluOp::Unary(UnOp::Sar, W)),
    RotLC => (AluOp::Unary(UnOp::RotLC, W)),
    RotRC => (AluOp::Unary(UnOp::RotRC, W)),

    AddL => (AluOp::Binary(BinOp::Add, L)),
    SubL => (AluOp::Binary(BinOp::Sub, L)),
    MulL => (AluOp::Binary(BinOp::Mul, L)),
    DivL => (AluOp::Binary(BinOp::Div, L)),
    ModL => (AluOp::Binary(BinOp::Mod, L)),
    NegL => (AluOp::Unary(UnOp::Neg, L)),
    NotL => (AluOp::Unary(UnOp::Not, L)),
    IncL => (AluOp::Unary(UnOp::Inc, L)),
    DecL => (AluOp::Unary(UnOp::Dec, L)),
    OrL => (AluOp::Binary(BinOp::Or, L)),
    XorL => (AluOp::Binary(BinOp::Xor, L)),
    AndL => (AluOp::Binary(BinOp::And, L)),
    ShlL => (AluOp::Unary(UnOp::Shl, L)),
    ShrL => (AluOp::Unary(UnOp::Shr, L)),
    SarL => (AluOp::Unary(UnOp::Sar, L)),
    RotLCL => (AluOp::Unary(UnOp::RotLC, L)),
    RotRCL => (AluOp::Unary(UnOp::RotRC, L)),

    W2l => (AluOp::Widen),
    Sw2l => (AluOp::WidenSigned),
    L2w => (AluOp::Narrow),
}

/// Machine-control instructions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SystemOp {
    /// Does nothing
    Nop,
    /// Waits for an interrupt, or stops if interrupts are disabled
    Halt,
    /// Enables interrupt requests
    EnableInterrupts,
    /// Disables interrupt requests
    DisableInterrupts,
}

/// A decoded instruction, including its operands
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Machine control
    System(SystemOp),
    /// Operand stack manipulation
    Stack(StackOp),
    /// Loads, stores and block copies
    Memory(MemOp),
    /// Calls, returns and local variables
    Frame(FrameOp),
    /// `jmp` in any of its modes
    Jump(Jump),
    /// Arithmetic and logic
    Alu(AluOp),
}

fn fetch_long<F>(fetch: &mut F, i: u32) -> Result<Long, Fault>
where
    F: FnMut(u32) -> Result<Word, Fault>,
{
    Ok(word::join(fetch(i)?, fetch(i + 1)?))
}

impl Instruction {
    /// Decodes a single instruction
    ///
    /// `fetch(i)` must return the word at offset `i` from the start of the
    /// instruction; it is called only for words that belong to it.
    pub fn decode<F>(mut fetch: F) -> Result<Self, Fault>
    where
        F: FnMut(u32) -> Result<Word, Fault>,
    {
        let op = Opcode::try_from(fetch(0)?)
            .map_err(|op| Fault::UnknownOpcode { op })?;
        let i = match op {
            Opcode::Nop => Instruction::System(SystemOp::Nop),
            Opcode::Hlt => Instruction::System(SystemOp::Halt),
            Opcode::Ei => Instruction::System(SystemOp::EnableInterrupts),
            Opcode::Di => Instruction::System(SystemOp::DisableInterrupts),

            Opcode::Push => Instruction::Stack(StackOp::Push(fetch(1)?)),
            Opcode::PushL => Instruction::Stack(StackOp::PushLong(
                fetch_long(&mut fetch, 1)?,
            )),
            Opcode::Pop => Instruction::Stack(StackOp::Pop(W)),
            Opcode::PopL => Instruction::Stack(StackOp::Pop(L)),
            Opcode::Dup => Instruction::Stack(StackOp::Dup(W)),
            Opcode::DupL => Instruction::Stack(StackOp::Dup(L)),
            Opcode::Swap => Instruction::Stack(StackOp::Swap(W)),
            Opcode::SwapL => Instruction::Stack(StackOp::Swap(L)),
            Opcode::Over => Instruction::Stack(StackOp::Over),

            Opcode::Load => {
                Instruction::Memory(MemOp::Load(W, fetch_long(&mut fetch, 1)?))
            }
            Opcode::LoadL => {
                Instruction::Memory(MemOp::Load(L, fetch_long(&mut fetch, 1)?))
            }
            Opcode::Store => {
                Instruction::Memory(MemOp::Store(W, fetch_long(&mut fetch, 1)?))
            }
            Opcode::StoreL => {
                Instruction::Memory(MemOp::Store(L, fetch_long(&mut fetch, 1)?))
            }
            Opcode::LoadI => Instruction::Memory(MemOp::LoadIndirect(W)),
            Opcode::LoadIL => Instruction::Memory(MemOp::LoadIndirect(L)),
            Opcode::StoreI => Instruction::Memory(MemOp::StoreIndirect(W)),
            Opcode::StoreIL => Instruction::Memory(MemOp::StoreIndirect(L)),
            Opcode::Memc => Instruction::Memory(MemOp::Copy),

            Opcode::Call => {
                Instruction::Frame(FrameOp::Call(fetch_long(&mut fetch, 1)?))
            }
            Opcode::CallI => Instruction::Frame(FrameOp::CallIndirect),
            Opcode::Ret => Instruction::Frame(FrameOp::Ret),
            Opcode::Ret1 => Instruction::Frame(FrameOp::Ret1),
            Opcode::Ret2 => Instruction::Frame(FrameOp::Ret2),
            Opcode::LoadLocal => {
                Instruction::Frame(FrameOp::LoadLocal(W, fetch(1)?))
            }
            Opcode::LoadLocalL => {
                Instruction::Frame(FrameOp::LoadLocal(L, fetch(1)?))
            }
            Opcode::StoreLocal => {
                Instruction::Frame(FrameOp::StoreLocal(W, fetch(1)?))
            }
            Opcode::StoreLocalL => {
                Instruction::Frame(FrameOp::StoreLocal(L, fetch(1)?))
            }
            Opcode::AddrLocal => {
                Instruction::Frame(FrameOp::AddrLocal(fetch(1)?))
            }

            Opcode::Jmp => {
                let mode = Mode::try_from(fetch(1)?)
                    .map_err(|mode| Fault::UnknownJumpMode { mode })?;
                let target = if mode == Mode::Relative {
                    0
                } else {
                    fetch_long(&mut fetch, 2)?
                };
                Instruction::Jump(Jump { mode, target })
            }

            op => Instruction::Alu(
                op.alu().ok_or(Fault::UnknownOpcode { op: op as Word })?,
            ),
        };
        Ok(i)
    }

    /// Returns the opcode of this instruction
    pub fn opcode(&self) -> Opcode {
        match *self {
            Instruction::System(s) => match s {
                SystemOp::Nop => Opcode::Nop,
                SystemOp::Halt => Opcode::Hlt,
                SystemOp::EnableInterrupts => Opcode::Ei,
                SystemOp::DisableInterrupts => Opcode::Di,
            },
            Instruction::Stack(s) => match s {
                StackOp::Push(..) => Opcode::Push,
                StackOp::PushLong(..) => Opcode::PushL,
                StackOp::Pop(W) => Opcode::Pop,
                StackOp::Pop(L) => Opcode::PopL,
                StackOp::Dup(W) => Opcode::Dup,
                StackOp::Dup(L) => Opcode::DupL,
                StackOp::Swap(W) => Opcode::Swap,
                StackOp::Swap(L) => Opcode::SwapL,
                StackOp::Over => Opcode::Over,
            },
            Instruction::Memory(m) => match m {
                MemOp::Load(W, _) => Opcode::Load,
                MemOp::Load(L, _) => Opcode::LoadL,
                MemOp::Store(W, _) => Opcode::Store,
                MemOp::Store(L, _) => Opcode::StoreL,
                MemOp::LoadIndirect(W) => Opcode::LoadI,
                MemOp::LoadIndirect(L) => Opcode::LoadIL,
                MemOp::StoreIndirect(W) => Opcode::StoreI,
                MemOp::StoreIndirect(L) => Opcode::StoreIL,
                MemOp::Copy => Opcode::Memc,
            },
            Instruction::Frame(fr) => match fr {
                FrameOp::Call(..) => Opcode::Call,
                FrameOp::CallIndirect => Opcode::CallI,
                FrameOp::Ret => Opcode::Ret,
                FrameOp::Ret1 => Opcode::Ret1,
                FrameOp::Ret2 => Opcode::Ret2,
                FrameOp::LoadLocal(W, _) => Opcode::LoadLocal,
                FrameOp::LoadLocal(L, _) => Opcode::LoadLocalL,
                FrameOp::StoreLocal(W, _) => Opcode::StoreLocal,
                FrameOp::StoreLocal(L, _) => Opcode::StoreLocalL,
                FrameOp::AddrLocal(..) => Opcode::AddrLocal,
            },
            Instruction::Jump(..) => Opcode::Jmp,
            Instruction::Alu(a) => a.opcode(),
        }
    }

    /// Number of words occupied by this instruction, including operands
    pub fn width(&self) -> u32 {
        match *self {
            Instruction::Stack(StackOp::Push(..))
            | Instruction::Frame(
                FrameOp::LoadLocal(..)
                | FrameOp::StoreLocal(..)
                | FrameOp::AddrLocal(..),
            ) => 2,
            Instruction::Stack(StackOp::PushLong(..))
            | Instruction::Memory(MemOp::Load(..) | MemOp::Store(..))
            | Instruction::Frame(FrameOp::Call(..)) => 3,
            Instruction::Jump(j) if j.mode == Mode::Relative => 2,
            Instruction::Jump(..) => 4,
            _ => 1,
        }
    }

    /// Appends the encoded form of this instruction to `out`
    pub fn encode(&self, out: &mut Vec<Word>) {
        out.push(self.opcode() as Word);
        match *self {
            Instruction::Stack(StackOp::PushLong(v))
            | Instruction::Memory(MemOp::Load(_, v) | MemOp::Store(_, v))
            | Instruction::Frame(FrameOp::Call(v)) => {
                let (hi, lo) = word::split(v);
                out.extend([hi, lo]);
            }
            Instruction::Stack(StackOp::Push(w))
            | Instruction::Frame(
                FrameOp::LoadLocal(_, w)
                | FrameOp::StoreLocal(_, w)
                | FrameOp::AddrLocal(w),
            ) => out.push(word::word(u32::from(w))),
            Instruction::Jump(j) => {
                out.push(j.mode as Word);
                if j.mode != Mode::Relative {
                    let (hi, lo) = word::split(j.target);
                    out.extend([hi, lo]);
                }
            }
            _ => (),
        }
    }

    /// Returns the absolute operand address, if this instruction has one
    pub fn target(&self) -> Option<Addr> {
        match *self {
            Instruction::Memory(MemOp::Load(_, a) | MemOp::Store(_, a))
            | Instruction::Frame(FrameOp::Call(a)) => Some(a),
            Instruction::Jump(j) if j.mode != Mode::Relative => Some(j.target),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Jump(j) => write!(f, "{}", j.mode.mnemonic())?,
            _ => write!(f, "{}", self.opcode().mnemonic())?,
        }
        match *self {
            Instruction::Stack(StackOp::Push(w))
            | Instruction::Frame(
                FrameOp::LoadLocal(_, w)
                | FrameOp::StoreLocal(_, w)
                | FrameOp::AddrLocal(w),
            ) => write!(f, " {w:#05x}"),
            Instruction::Stack(StackOp::PushLong(v)) => write!(f, " {v:#08x}"),
            _ => match self.target() {
                Some(a) => write!(f, " {a:#08x}"),
                None => Ok(()),
            },
        }
    }
}
