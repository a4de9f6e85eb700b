use serde::Serialize;
use thiserror::Error;

use crate::instructions::Format;
use crate::memory::Width;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Op {
    // R
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
    // I (ALU)
    Addi,
    Andi,
    Ori,
    Xori,
    Slti,
    Slli,
    Srli,
    Srai,
    // I (loads, jalr)
    Lb,
    Lh,
    Lw,
    Ld,
    Jalr,
    // S
    Sb,
    Sh,
    Sw,
    Sd,
    // SB
    Beq,
    Bne,
    Blt,
    Bge,
    // U / UJ
    Lui,
    Auipc,
    Jal,
    /// The halt word `0x00000073`.
    Ecall,
}

/// Coarse behaviour class, used by the pipeline to set control flags and
/// by the statistics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpClass {
    Alu,
    Load,
    Store,
    Branch,
    Jal,
    Jalr,
    Halt,
}

impl Op {
    pub fn class(self) -> OpClass {
        use Op::*;
        match self {
            Lb | Lh | Lw | Ld => OpClass::Load,
            Sb | Sh | Sw | Sd => OpClass::Store,
            Beq | Bne | Blt | Bge => OpClass::Branch,
            Jal => OpClass::Jal,
            Jalr => OpClass::Jalr,
            Ecall => OpClass::Halt,
            _ => OpClass::Alu,
        }
    }

    /// Access width of a load or store.
    pub fn access_width(self) -> Option<Width> {
        use Op::*;
        match self {
            Lb | Sb => Some(Width::Byte),
            Lh | Sh => Some(Width::Half),
            Lw | Sw => Some(Width::Word),
            Ld | Sd => Some(Width::Double),
            _ => None,
        }
    }

    pub fn is_shift_imm(self) -> bool {
        matches!(self, Op::Slli | Op::Srli | Op::Srai)
    }
}

/// A decoded instruction word. Register fields the format does not use
/// are `None`. `imm` is the effective operand value: sign-extended for
/// I/S/SB/UJ, already shifted left by 12 for U, the shift amount for
/// shift-immediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decoded {
    pub word: u32,
    pub op: Op,
    pub format: Format,
    pub opcode: u8,
    pub funct3: Option<u8>,
    pub funct7: Option<u8>,
    pub rd: Option<u8>,
    pub rs1: Option<u8>,
    pub rs2: Option<u8>,
    pub imm: i32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("illegal instruction word {word:#010x}")]
    Illegal { word: u32 },
    #[error("unsupported operation `{mnemonic}` in word {word:#010x}")]
    Unsupported { word: u32, mnemonic: &'static str },
}

pub trait Decoder {
    fn decode(&self, word: u32) -> Result<Decoded, DecodeError>;
}
