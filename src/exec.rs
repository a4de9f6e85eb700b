use serde::Serialize;

use crate::decoder::Op;

/// Operations the ALU can perform. Branch comparisons produce 1 or 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
    Slt,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Ge,
    PassB,
    Nop,
}

impl From<Op> for AluOp {
    fn from(op: Op) -> Self {
        use Op::*;
        match op {
            // loads, stores, auipc and jalr compute an address
            Add | Addi | Lb | Lh | Lw | Ld | Sb | Sh | Sw | Sd | Auipc | Jalr => AluOp::Add,
            Sub => AluOp::Sub,
            And | Andi => AluOp::And,
            Or | Ori => AluOp::Or,
            Xor | Xori => AluOp::Xor,
            Sll | Slli => AluOp::Sll,
            Srl | Srli => AluOp::Srl,
            Sra | Srai => AluOp::Sra,
            Slt | Slti => AluOp::Slt,
            Mul => AluOp::Mul,
            Div => AluOp::Div,
            Rem => AluOp::Rem,
            Beq => AluOp::Eq,
            Bne => AluOp::Ne,
            Blt => AluOp::Lt,
            Bge => AluOp::Ge,
            Lui | Jal => AluOp::PassB,
            Ecall => AluOp::Nop,
        }
    }
}

pub trait Executor {
    fn exec(&self, op: AluOp, a: u32, b: u32) -> u32;
}

/// 32-bit integer ALU with wrapping arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntExecutor;

impl Executor for IntExecutor {
    fn exec(&self, op: AluOp, a: u32, b: u32) -> u32 {
        let (sa, sb) = (a as i32, b as i32);
        match op {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Xor => a ^ b,
            AluOp::Sll => a.wrapping_shl(b & 0x1F),
            AluOp::Srl => a.wrapping_shr(b & 0x1F),
            AluOp::Sra => sa.wrapping_shr(b & 0x1F) as u32,
            AluOp::Slt => (sa < sb) as u32,
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Div => {
                if sb == 0 {
                    u32::MAX
                } else {
                    sa.wrapping_div(sb) as u32
                }
            }
            AluOp::Rem => {
                if sb == 0 {
                    a
                } else {
                    sa.wrapping_rem(sb) as u32
                }
            }
            AluOp::Eq => (a == b) as u32,
            AluOp::Ne => (a != b) as u32,
            AluOp::Lt => (sa < sb) as u32,
            AluOp::Ge => (sa >= sb) as u32,
            AluOp::PassB => b,
            AluOp::Nop => 0,
        }
    }
}
