use crate::decoder::{Decoded, Op, OpClass};
use crate::instructions::{self, Format};

fn reg(r: Option<u8>) -> String {
    format!("x{}", r.unwrap_or(0))
}

fn mnemonic(op: Op) -> &'static str {
    instructions::describe(op).map_or("???", |d| d.mnemonic)
}

/// Renders a decoded word in assembler syntax. Branch and `jal` targets
/// are printed as byte offsets from the instruction.
pub fn fmt_decoded(d: &Decoded) -> String {
    let m = mnemonic(d.op);
    match (d.format, d.op.class()) {
        (Format::Sys, _) => m.to_string(),
        (Format::R, _) => format!("{m} {}, {}, {}", reg(d.rd), reg(d.rs1), reg(d.rs2)),
        (Format::I, OpClass::Load) => format!("{m} {}, {}({})", reg(d.rd), d.imm, reg(d.rs1)),
        (Format::I, _) => format!("{m} {}, {}, {}", reg(d.rd), reg(d.rs1), d.imm),
        (Format::S, _) => format!("{m} {}, {}({})", reg(d.rs2), d.imm, reg(d.rs1)),
        (Format::SB, _) => format!("{m} {}, {}, {}", reg(d.rs1), reg(d.rs2), d.imm),
        (Format::U, _) => format!("{m} {}, {:#x}", reg(d.rd), (d.imm as u32) >> 12),
        (Format::UJ, _) => format!("{m} {}, {}", reg(d.rd), d.imm),
    }
}

/// Absolute target of a branch or `jal` at `pc`.
pub fn branch_target(d: &Decoded, pc: u32) -> Option<u32> {
    matches!(d.format, Format::SB | Format::UJ).then(|| pc.wrapping_add(d.imm as u32))
}
