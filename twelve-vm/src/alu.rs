//! Word and long arithmetic
//!
//! Every operation exists at both widths with identical rules, applied to 12
//! bits for words and 24 bits for longs.  The carry flag is the only overflow
//! signal visible to programs, so each operation documents exactly when it
//! sets or clears it.
use crate::{
    error::Fault,
    word::{self, Width, LONG_MASK},
    Vm,
};

/// Two-operand operations, `a op b` where `b` is on top of the stack
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    /// Sum; carry if it exceeds the width
    Add,
    /// Difference; carry if the signed difference exceeds the width
    Sub,
    /// Product; carry if it exceeds the width
    Mul,
    /// Unsigned quotient
    Div,
    /// Unsigned remainder
    Mod,
    /// Bitwise or, carry unchanged
    Or,
    /// Bitwise exclusive or, carry unchanged
    Xor,
    /// Bitwise and, carry unchanged
    And,
}

/// Single-operand operations
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Negation; carry unless the operand is zero
    Neg,
    /// Bitwise inversion; carry cleared
    Not,
    /// Increment; carry on wrap to zero
    Inc,
    /// Decrement; carry on wrap from zero
    Dec,
    /// Shift left by one; carry is the bit shifted out
    Shl,
    /// Logical shift right by one; carry is the bit shifted out
    Shr,
    /// Arithmetic shift right by one; carry is the bit shifted out
    Sar,
    /// Rotate left through carry
    RotLC,
    /// Rotate right through carry
    RotRC,
}

/// An ALU instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// Pops two values, pushes one
    Binary(BinOp, Width),
    /// Pops one value, pushes one
    Unary(UnOp, Width),
    /// Multiplies two words, pushing the full 24-bit product as a long
    Mul2,
    /// Zero-extends a word to a long
    Widen,
    /// Sign-extends a word to a long
    WidenSigned,
    /// Truncates a long to its low word
    Narrow,
}

/// Result of an ALU evaluation: the new value, and the new carry flag (or
/// `None` if carry is unchanged)
pub type Output = (u32, Option<bool>);

/// Evaluates a two-operand operation
///
/// Both operands are masked to `w` before use.
pub fn binary(op: BinOp, w: Width, a: u32, b: u32) -> Result<Output, Fault> {
    let mask = w.mask();
    let (a, b) = (a & mask, b & mask);
    let out = match op {
        BinOp::Add => {
            let s = a + b;
            (s & mask, Some(s > mask))
        }
        BinOp::Sub => {
            let d = i64::from(a) - i64::from(b);
            (d as u32 & mask, Some(d > i64::from(mask)))
        }
        BinOp::Mul => {
            let p = u64::from(a) * u64::from(b);
            (p as u32 & mask, Some(p > u64::from(mask)))
        }
        BinOp::Div => {
            let q = a.checked_div(b).ok_or(Fault::DivideByZero)?;
            (q, Some(q > mask))
        }
        BinOp::Mod => {
            let r = a.checked_rem(b).ok_or(Fault::DivideByZero)?;
            (r, Some(r > mask))
        }
        BinOp::Or => (a | b, None),
        BinOp::Xor => (a ^ b, None),
        BinOp::And => (a & b, None),
    };
    Ok(out)
}

/// Evaluates a single-operand operation
///
/// `carry` is the incoming carry flag, used by the rotations.
pub fn unary(op: UnOp, w: Width, a: u32, carry: bool) -> Output {
    let mask = w.mask();
    let msb = w.msb();
    let a = a & mask;
    match op {
        UnOp::Neg => {
            let r = -i64::from(a);
            (r as u32 & mask, Some(r < 0))
        }
        UnOp::Not => (!a & mask, Some(false)),
        UnOp::Inc => {
            let r = a + 1;
            (r & mask, Some(r > mask))
        }
        UnOp::Dec => {
            let r = i64::from(a) - 1;
            (r as u32 & mask, Some(r < 0))
        }
        UnOp::Shl => ((a << 1) & mask, Some(a & msb != 0)),
        UnOp::Shr => (a >> 1, Some(a & 1 != 0)),
        UnOp::Sar => ((a >> 1) | (a & msb), Some(a & 1 != 0)),
        UnOp::RotLC => {
            (((a << 1) | u32::from(carry)) & mask, Some(a & msb != 0))
        }
        UnOp::RotRC => {
            let top = if carry { msb } else { 0 };
            ((a >> 1) | top, Some(a & 1 != 0))
        }
    }
}

/// Multiplies two words into a long
pub fn mul2(a: u32, b: u32) -> Output {
    let p = (a & word::WORD_MASK) * (b & word::WORD_MASK);
    (p & LONG_MASK, Some(p > LONG_MASK))
}

impl Vm {
    pub(crate) fn exec_alu(&mut self, op: AluOp) -> Result<(), Fault> {
        let (w, out) = match op {
            AluOp::Binary(op, w) => {
                let b = self.pop_width(w)?;
                let a = self.pop_width(w)?;
                (w, binary(op, w, a, b)?)
            }
            AluOp::Unary(op, w) => {
                let a = self.pop_width(w)?;
                (w, unary(op, w, a, self.regs.carry))
            }
            AluOp::Mul2 => {
                let b = u32::from(self.pop()?);
                let a = u32::from(self.pop()?);
                (Width::Long, mul2(a, b))
            }
            AluOp::Widen => {
                let a = u32::from(self.pop()?);
                (Width::Long, (a, None))
            }
            AluOp::WidenSigned => {
                let a = word::sext(self.pop()?);
                (Width::Long, (word::long(a as u32), None))
            }
            AluOp::Narrow => {
                let a = self.pop_long()?;
                (Width::Word, (a & word::WORD_MASK, None))
            }
        };
        let (v, carry) = out;
        self.push_width(w, v)?;
        if let Some(c) = carry {
            self.regs.carry = c;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        isa::{Instruction, Opcode},
        memory::Layout,
        Registers,
    };

    #[test]
    fn add_carry() {
        assert_eq!(
            binary(BinOp::Add, Width::Word, 0x800, 0x800),
            Ok((0, Some(true)))
        );
        assert_eq!(
            binary(BinOp::Add, Width::Word, 0x800, 0x7FF),
            Ok((0xFFF, Some(false)))
        );
        assert_eq!(
            binary(BinOp::Add, Width::Long, 0xFF_FFFF, 1),
            Ok((0, Some(true)))
        );
    }

    #[test]
    fn sub_never_borrows() {
        assert_eq!(
            binary(BinOp::Sub, Width::Word, 0, 1),
            Ok((0xFFF, Some(false)))
        );
        assert_eq!(
            binary(BinOp::Sub, Width::Long, 5, 7),
            Ok((0xFF_FFFE, Some(false)))
        );
    }

    #[test]
    fn divide_by_zero() {
        assert_eq!(
            binary(BinOp::Div, Width::Word, 5, 0),
            Err(Fault::DivideByZero)
        );
        assert_eq!(
            binary(BinOp::Mod, Width::Long, 5, 0),
            Err(Fault::DivideByZero)
        );
    }

    #[test]
    fn mul2_product() {
        assert_eq!(mul2(0xFFF, 0xFFF), (0xFFE001, Some(false)));
    }

    /// Parses a line of the form `[C] #a #b op ( results ) [C]`
    ///
    /// Three-digit literals are pushed as words and six-digit literals as
    /// longs; results are listed as words, bottom of the stack first.  A
    /// leading `C` sets carry before the operation, and a trailing `C` or `-`
    /// is the expected carry afterwards.
    fn parse_and_test(s: &str) {
        let mut vm = Vm::new(Layout::new(64, 0, 0, 16).unwrap());
        vm.reset(0);
        let base = vm.regs().sp;
        let mut iter = s.split_whitespace().peekable();
        if iter.peek() == Some(&"C") {
            vm.regs.carry = true;
            iter.next();
        }
        let mut op = None;
        while let Some(i) = iter.next() {
            if let Some(lit) = i.strip_prefix('#') {
                let v = u32::from_str_radix(lit, 16).unwrap();
                match lit.len() {
                    3 => vm.push(v as u16).unwrap(),
                    6 => vm.push_long(v).unwrap(),
                    _ => panic!("invalid length for literal: {i:?}"),
                }
            } else if i == "(" {
                let mut expected = vec![];
                for s in iter.by_ref() {
                    if s == ")" {
                        break;
                    }
                    expected.push(u16::from_str_radix(s, 16).unwrap());
                }
                let carry = match iter.next() {
                    Some("C") => true,
                    Some("-") => false,
                    c => panic!("missing carry marker in {s:?}: {c:?}"),
                };
                let op: Opcode = op.unwrap();
                let i = Instruction::decode(|_| Ok(op as u16)).unwrap();
                let Instruction::Alu(a) = i else {
                    panic!("{op:?} is not an ALU op");
                };
                vm.exec_alu(a).unwrap();
                let Registers { sp, .. } = *vm.regs();
                let actual =
                    &vm.memory().words()[base as usize + 1..=sp as usize];
                let s = s.trim();
                assert_eq!(actual, expected, "failed to execute {s:?}");
                assert_eq!(vm.regs().carry, carry, "bad carry in {s:?}");
                return;
            } else {
                let o = Opcode::from_mnemonic(i);
                op = Some(o.unwrap_or_else(|| panic!("bad op {i}")));
            }
        }
        panic!("no result in {s:?}");
    }

    #[test]
    fn opcodes() {
        const TEST_SUITE: &str = "
            #800 #800 add               ( 000 ) C
            #800 #7ff add               ( fff ) -
            #005 #003 sub               ( 002 ) -
            #000 #001 sub               ( fff ) -
            #040 #040 mul               ( 000 ) C
            #010 #010 mul               ( 100 ) -
            #fff #fff mul2              ( ffe 001 ) -
            #00a #003 div               ( 003 ) -
            #00a #003 mod               ( 001 ) -
            #001 neg                    ( fff ) C
            #000 neg                    ( 000 ) -
            C #0f0 not                  ( f0f ) -
            #fff inc                    ( 000 ) C
            #000 dec                    ( fff ) C
            #001 dec                    ( 000 ) -
            C #0f0 #00f or              ( 0ff ) C
            #0ff #0f0 xor               ( 00f ) -
            #0ff #0f0 and               ( 0f0 ) -
            #801 shl                    ( 002 ) C
            #801 shr                    ( 400 ) C
            #802 sar                    ( c01 ) -
            C #400 rot_l_c              ( 801 ) -
            #800 rot_l_c                ( 000 ) C
            C #002 rot_r_c              ( 801 ) -
            #001 rot_r_c                ( 000 ) C
            #ffffff #000001 add_l       ( 000 000 ) C
            #000fff #000001 add_l       ( 001 000 ) -
            #000000 #000001 sub_l       ( fff fff ) -
            #001000 #001000 mul_l       ( 000 000 ) C
            #000100 #000010 mul_l       ( 001 000 ) -
            #123456 #000010 div_l       ( 012 345 ) -
            #123456 #000010 mod_l       ( 000 006 ) -
            #000001 neg_l               ( fff fff ) C
            #000000 not_l               ( fff fff ) -
            #ffffff inc_l               ( 000 000 ) C
            #000000 dec_l               ( fff fff ) C
            #f0f0f0 #0f0f0f or_l        ( fff fff ) -
            #f0f0f0 #ff00ff xor_l       ( 0ff 00f ) -
            #f0f0f0 #ff00ff and_l       ( f00 0f0 ) -
            #800001 shl_l               ( 000 002 ) C
            #800001 shr_l               ( 400 000 ) C
            #800000 sar_l               ( c00 000 ) -
            C #000000 rot_l_c_l         ( 000 001 ) -
            C #000000 rot_r_c_l         ( 800 000 ) -
            #abc w2l                    ( 000 abc ) -
            #abc sw2l                   ( fff abc ) -
            #123 sw2l                   ( 000 123 ) -
            #123456 l2w                 ( 456 ) -
        ";
        for line in TEST_SUITE.lines().filter(|l| !l.trim().is_empty()) {
            parse_and_test(line);
        }
    }

    #[test]
    fn long_composition() {
        let mut vm = Vm::new(Layout::new(64, 0, 0, 16).unwrap());
        vm.reset(0);
        vm.push(0x001).unwrap();
        vm.push(0xFFF).unwrap();
        assert_eq!(vm.pop_long(), Ok(0x1FFF));
    }

    #[test]
    fn failed_op_keeps_carry() {
        let mut vm = Vm::new(Layout::new(64, 0, 0, 16).unwrap());
        vm.reset(0);
        vm.regs.carry = true;
        vm.push(1).unwrap();
        vm.push(0).unwrap();
        let div = AluOp::Binary(BinOp::Div, Width::Word);
        assert_eq!(vm.exec_alu(div), Err(Fault::DivideByZero));
        assert!(vm.regs().carry);
    }
}
