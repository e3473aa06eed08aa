//! Conditional and unconditional jumps
//!
//! `jmp` is followed by a mode word selecting the condition, then (for every
//! mode except [`Mode::Relative`]) a two-word absolute target.  Operands are
//! popped whether or not the jump is taken.
use crate::{
    error::Fault,
    word::{self, Addr, Width, Word},
    Vm,
};

macro_rules! modes {
    ($(
        $(#[$meta:meta])*
        $name:ident = $value:literal, $mnemonic:literal;
    )*) => {
        /// Jump condition, as encoded in the word following `jmp`
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Mode {
            $($(#[$meta])* $name = $value,)*
        }

        impl Mode {
            /// Returns the assembler mnemonic for a `jmp` in this mode
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Mode::$name => $mnemonic,)*
                }
            }
        }

        impl TryFrom<Word> for Mode {
            type Error = Word;
            fn try_from(w: Word) -> Result<Self, Word> {
                match w {
                    $($value => Ok(Mode::$name),)*
                    _ => Err(w),
                }
            }
        }
    };
}

modes! {
    /// Always taken
    Always = 0, "jmp";
    /// Pops a word; taken if zero
    Zero = 1, "jz";
    /// Pops a word; taken if non-zero
    NotZero = 2, "jnz";
    /// Pops a long; taken if zero
    ZeroL = 3, "jz_l";
    /// Pops a long; taken if non-zero
    NotZeroL = 4, "jnz_l";
    /// Taken if carry is set
    Carry = 5, "jc";
    /// Taken if carry is clear
    NoCarry = 6, "jnc";
    /// Pops a word; taken if positive
    Greater = 7, "jgz";
    /// Pops a word; taken if negative
    Less = 8, "jlz";
    /// Pops a long; taken if positive
    GreaterL = 9, "jgz_l";
    /// Pops a long; taken if negative
    LessL = 10, "jlz_l";
    /// Pops a word; taken if not negative
    GreaterEq = 11, "jgez";
    /// Pops a word; taken if not positive
    LessEq = 12, "jlez";
    /// Pops a long; taken if not negative
    GreaterEqL = 13, "jgez_l";
    /// Pops a long; taken if not positive
    LessEqL = 14, "jlez_l";
    /// Pops two words; taken if equal
    Equal = 15, "jeq";
    /// Pops two words; taken if different
    NotEqual = 16, "jne";
    /// Pops a signed word offset; always jumps relative to the following
    /// instruction
    Relative = 17, "jro";
}

/// A decoded `jmp` instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Jump {
    /// Condition
    pub mode: Mode,
    /// Absolute destination (unused by [`Mode::Relative`])
    pub target: Addr,
}

impl Vm {
    fn pop_signed(&mut self, w: Width) -> Result<i32, Fault> {
        let v = self.pop_width(w)?;
        Ok(w.sign_extend(v))
    }

    /// Executes a jump, returning the new program counter
    pub(crate) fn exec_jump(
        &mut self,
        j: Jump,
        next: Addr,
    ) -> Result<Addr, Fault> {
        use Width::{Long as L, Word as W};
        let taken = match j.mode {
            Mode::Always => true,
            Mode::Zero => self.pop_width(W)? == 0,
            Mode::NotZero => self.pop_width(W)? != 0,
            Mode::ZeroL => self.pop_width(L)? == 0,
            Mode::NotZeroL => self.pop_width(L)? != 0,
            Mode::Carry => self.regs.carry,
            Mode::NoCarry => !self.regs.carry,
            Mode::Greater => self.pop_signed(W)? > 0,
            Mode::Less => self.pop_signed(W)? < 0,
            Mode::GreaterL => self.pop_signed(L)? > 0,
            Mode::LessL => self.pop_signed(L)? < 0,
            Mode::GreaterEq => self.pop_signed(W)? >= 0,
            Mode::LessEq => self.pop_signed(W)? <= 0,
            Mode::GreaterEqL => self.pop_signed(L)? >= 0,
            Mode::LessEqL => self.pop_signed(L)? <= 0,
            Mode::Equal | Mode::NotEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                (a == b) == (j.mode == Mode::Equal)
            }
            Mode::Relative => {
                let offset = word::sext(self.pop()?);
                return Ok(word::long(next.wrapping_add_signed(offset)));
            }
        };
        Ok(if taken { j.target } else { next })
    }
}
