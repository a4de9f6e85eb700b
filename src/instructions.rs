use serde::Serialize;

use crate::decoder::Op;

pub const OPCODE_OP: u8 = 0b011_0011;
pub const OPCODE_OP_IMM: u8 = 0b001_0011;
pub const OPCODE_LOAD: u8 = 0b000_0011;
pub const OPCODE_STORE: u8 = 0b010_0011;
pub const OPCODE_BRANCH: u8 = 0b110_0011;
pub const OPCODE_JAL: u8 = 0b110_1111;
pub const OPCODE_JALR: u8 = 0b110_0111;
pub const OPCODE_LUI: u8 = 0b011_0111;
pub const OPCODE_AUIPC: u8 = 0b001_0111;
pub const OPCODE_SYSTEM: u8 = 0b111_0011;

/// Terminates the program when it reaches write-back.
pub const HALT_WORD: u32 = 0x0000_0073;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Format {
    R,
    I,
    S,
    SB,
    U,
    UJ,
    Sys,
}

impl Format {
    /// Width of the immediate field as printed in the assembler trace.
    pub fn imm_width(self) -> Option<u32> {
        match self {
            Format::I | Format::S => Some(12),
            Format::SB => Some(13),
            Format::U => Some(20),
            Format::UJ => Some(21),
            Format::R | Format::Sys => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: &'static str,
    pub format: Format,
    pub opcode: u8,
    pub funct3: Option<u8>,
    pub funct7: Option<u8>,
}

const fn desc(
    op: Op,
    mnemonic: &'static str,
    format: Format,
    opcode: u8,
    funct3: Option<u8>,
    funct7: Option<u8>,
) -> InstrDesc {
    InstrDesc { op, mnemonic, format, opcode, funct3, funct7 }
}

pub const TABLE: &[InstrDesc] = &[
    desc(Op::Add, "add", Format::R, OPCODE_OP, Some(0b000), Some(0b000_0000)),
    desc(Op::Sub, "sub", Format::R, OPCODE_OP, Some(0b000), Some(0b010_0000)),
    desc(Op::And, "and", Format::R, OPCODE_OP, Some(0b111), Some(0b000_0000)),
    desc(Op::Or, "or", Format::R, OPCODE_OP, Some(0b110), Some(0b000_0000)),
    desc(Op::Xor, "xor", Format::R, OPCODE_OP, Some(0b100), Some(0b000_0000)),
    desc(Op::Sll, "sll", Format::R, OPCODE_OP, Some(0b001), Some(0b000_0000)),
    desc(Op::Srl, "srl", Format::R, OPCODE_OP, Some(0b101), Some(0b000_0000)),
    desc(Op::Sra, "sra", Format::R, OPCODE_OP, Some(0b101), Some(0b010_0000)),
    desc(Op::Slt, "slt", Format::R, OPCODE_OP, Some(0b010), Some(0b000_0000)),
    desc(Op::Mul, "mul", Format::R, OPCODE_OP, Some(0b000), Some(0b000_0001)),
    desc(Op::Div, "div", Format::R, OPCODE_OP, Some(0b100), Some(0b000_0001)),
    desc(Op::Rem, "rem", Format::R, OPCODE_OP, Some(0b110), Some(0b000_0001)),
    desc(Op::Addi, "addi", Format::I, OPCODE_OP_IMM, Some(0b000), None),
    desc(Op::Andi, "andi", Format::I, OPCODE_OP_IMM, Some(0b111), None),
    desc(Op::Ori, "ori", Format::I, OPCODE_OP_IMM, Some(0b110), None),
    desc(Op::Xori, "xori", Format::I, OPCODE_OP_IMM, Some(0b100), None),
    desc(Op::Slti, "slti", Format::I, OPCODE_OP_IMM, Some(0b010), None),
    desc(Op::Slli, "slli", Format::I, OPCODE_OP_IMM, Some(0b001), Some(0b000_0000)),
    desc(Op::Srli, "srli", Format::I, OPCODE_OP_IMM, Some(0b101), Some(0b000_0000)),
    desc(Op::Srai, "srai", Format::I, OPCODE_OP_IMM, Some(0b101), Some(0b010_0000)),
    desc(Op::Lb, "lb", Format::I, OPCODE_LOAD, Some(0b000), None),
    desc(Op::Lh, "lh", Format::I, OPCODE_LOAD, Some(0b001), None),
    desc(Op::Lw, "lw", Format::I, OPCODE_LOAD, Some(0b010), None),
    desc(Op::Ld, "ld", Format::I, OPCODE_LOAD, Some(0b011), None),
    desc(Op::Jalr, "jalr", Format::I, OPCODE_JALR, Some(0b000), None),
    desc(Op::Sb, "sb", Format::S, OPCODE_STORE, Some(0b000), None),
    desc(Op::Sh, "sh", Format::S, OPCODE_STORE, Some(0b001), None),
    desc(Op::Sw, "sw", Format::S, OPCODE_STORE, Some(0b010), None),
    desc(Op::Sd, "sd", Format::S, OPCODE_STORE, Some(0b011), None),
    desc(Op::Beq, "beq", Format::SB, OPCODE_BRANCH, Some(0b000), None),
    desc(Op::Bne, "bne", Format::SB, OPCODE_BRANCH, Some(0b001), None),
    desc(Op::Blt, "blt", Format::SB, OPCODE_BRANCH, Some(0b100), None),
    desc(Op::Bge, "bge", Format::SB, OPCODE_BRANCH, Some(0b101), None),
    desc(Op::Lui, "lui", Format::U, OPCODE_LUI, None, None),
    desc(Op::Auipc, "auipc", Format::U, OPCODE_AUIPC, None, None),
    desc(Op::Jal, "jal", Format::UJ, OPCODE_JAL, None, None),
    desc(Op::Ecall, "ecall", Format::Sys, OPCODE_SYSTEM, Some(0b000), None),
];

/// Encodings that are recognised but deliberately not executed.
pub const UNSUPPORTED: &[(&str, u8, u8)] = &[
    ("sltu", OPCODE_OP, 0b011),
    ("sltiu", OPCODE_OP_IMM, 0b011),
    ("lbu", OPCODE_LOAD, 0b100),
    ("lhu", OPCODE_LOAD, 0b101),
    ("bltu", OPCODE_BRANCH, 0b110),
    ("bgeu", OPCODE_BRANCH, 0b111),
];

/// Finds an assemblable instruction by mnemonic. The halt word is never
/// written in source, so `ecall` is not returned.
pub fn lookup(mnemonic: &str) -> Option<&'static InstrDesc> {
    TABLE
        .iter()
        .find(|d| d.mnemonic == mnemonic && d.format != Format::Sys)
}

pub fn describe(op: Op) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.op == op)
}

/// Matches decoded fields against the table. `funct3`/`funct7` only take
/// part in the match when the entry specifies them.
pub fn classify(opcode: u8, funct3: u8, funct7: u8) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| {
        d.format != Format::Sys
            && d.opcode == opcode
            && d.funct3.map_or(true, |f| f == funct3)
            && d.funct7.map_or(true, |f| f == funct7)
    })
}

pub fn unsupported(opcode: u8, funct3: u8) -> Option<&'static str> {
    UNSUPPORTED
        .iter()
        .find(|(_, op, f3)| *op == opcode && *f3 == funct3)
        .map(|(name, _, _)| *name)
}

pub fn is_unsupported_mnemonic(mnemonic: &str) -> bool {
    UNSUPPORTED.iter().any(|(name, _, _)| *name == mnemonic)
}
