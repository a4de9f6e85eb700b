use std::fmt;

use serde::Serialize;

use super::error::AsmError;
use super::SymbolTable;
use crate::bits::{fits_signed, parse_literal, parse_signed, parse_unsigned, to_bin};
use crate::instructions::{self, Format, InstrDesc};

/// Immediate as it appears in the trace: the raw field bits and their width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImmField {
    pub bits: u32,
    pub width: u32,
}

/// Per-instruction field breakdown printed after `#` in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceFields {
    pub opcode: u8,
    pub funct3: Option<u8>,
    pub funct7: Option<u8>,
    pub rd: Option<u8>,
    pub rs1: Option<u8>,
    pub rs2: Option<u8>,
    pub imm: Option<ImmField>,
}

impl fmt::Display for TraceFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bin(v: Option<u8>, width: usize) -> String {
            v.map_or_else(|| "NULL".to_string(), |v| to_bin(v as u32, width))
        }
        let imm = self
            .imm
            .map_or_else(|| "NULL".to_string(), |i| to_bin(i.bits, i.width as usize));
        write!(
            f,
            "{}-{}-{}-{}-{}-{}-{}",
            to_bin(self.opcode as u32, 7),
            bin(self.funct3, 3),
            bin(self.funct7, 7),
            bin(self.rd, 5),
            bin(self.rs1, 5),
            bin(self.rs2, 5),
            imm
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    pub word: u32,
    pub trace: TraceFields,
}

/// Parses `x0`..`x31`.
pub fn parse_register(token: &str) -> Result<u8, AsmError> {
    let unknown = || AsmError::UnknownRegister(token.to_string());
    let digits = token.strip_prefix('x').ok_or_else(unknown)?;
    if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(unknown());
    }
    match digits.parse::<u8>() {
        Ok(r) if r < 32 => Ok(r),
        _ => Err(unknown()),
    }
}

fn pack_r(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

fn pack_i(imm12: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    ((imm12 & 0xFFF) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

fn pack_s(imm12: u32, rs2: u32, rs1: u32, funct3: u32, opcode: u32) -> u32 {
    let hi = (imm12 >> 5) & 0x7F;
    let lo = imm12 & 0x1F;
    (hi << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (lo << 7) | opcode
}

fn pack_b(imm13: u32, rs2: u32, rs1: u32, funct3: u32, opcode: u32) -> u32 {
    let b12 = (imm13 >> 12) & 1;
    let b11 = (imm13 >> 11) & 1;
    let b10_5 = (imm13 >> 5) & 0x3F;
    let b4_1 = (imm13 >> 1) & 0xF;
    (b12 << 31) | (b10_5 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (b4_1 << 8) | (b11 << 7) | opcode
}

fn pack_u(imm20: u32, rd: u32, opcode: u32) -> u32 {
    ((imm20 & 0xF_FFFF) << 12) | (rd << 7) | opcode
}

fn pack_j(imm21: u32, rd: u32, opcode: u32) -> u32 {
    let b20 = (imm21 >> 20) & 1;
    let b10_1 = (imm21 >> 1) & 0x3FF;
    let b11 = (imm21 >> 11) & 1;
    let b19_12 = (imm21 >> 12) & 0xFF;
    (b20 << 31) | (b10_1 << 21) | (b11 << 20) | (b19_12 << 12) | (rd << 7) | opcode
}

/// Byte offset from `pc` to a label, or a literal offset written in place
/// of the label. The offset must fit `bits` signed bits and be even.
fn resolve_offset(token: &str, pc: u32, symbols: &SymbolTable, bits: u32) -> Result<i32, AsmError> {
    let offset = if token.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        parse_literal(token)?.value
    } else {
        let target = symbols
            .get(token)
            .ok_or_else(|| AsmError::UndefinedLabel(token.to_string()))?;
        *target as i128 - pc as i128
    };
    if !fits_signed(offset, bits) {
        let half = 1i128 << (bits - 1);
        return Err(AsmError::ValueOutOfRange {
            text: token.to_string(),
            min: -half,
            max: half - 1,
        });
    }
    // bit 0 is not encoded
    if offset % 2 != 0 {
        return Err(AsmError::MisalignedOffset(token.to_string()));
    }
    Ok(offset as i32)
}

fn expect_operands(desc: &InstrDesc, tokens: &[&str], count: usize) -> Result<(), AsmError> {
    let given = tokens.len() - 1;
    if given < count {
        return Err(AsmError::MissingOperand {
            mnemonic: desc.mnemonic.to_string(),
            expected: count,
        });
    }
    if given > count {
        return Err(AsmError::UnexpectedText(tokens[count + 1..].join(" ")));
    }
    Ok(())
}

/// Encodes one tokenized instruction located at `pc`.
pub fn encode(tokens: &[&str], pc: u32, symbols: &SymbolTable) -> Result<Encoded, AsmError> {
    let Some(&mnemonic) = tokens.first() else {
        return Err(AsmError::UnknownMnemonic(String::new()));
    };
    let desc = match instructions::lookup(mnemonic) {
        Some(desc) => desc,
        None if instructions::is_unsupported_mnemonic(mnemonic) => {
            return Err(AsmError::UnsupportedOperation(mnemonic.to_string()))
        }
        None => return Err(AsmError::UnknownMnemonic(mnemonic.to_string())),
    };

    let opcode = desc.opcode as u32;
    let f3 = desc.funct3.unwrap_or(0) as u32;
    let f7 = desc.funct7.unwrap_or(0) as u32;
    let mut trace = TraceFields {
        opcode: desc.opcode,
        funct3: desc.funct3,
        funct7: None,
        rd: None,
        rs1: None,
        rs2: None,
        imm: None,
    };

    let word = match desc.format {
        Format::R => {
            expect_operands(desc, tokens, 3)?;
            let rd = parse_register(tokens[1])?;
            let rs1 = parse_register(tokens[2])?;
            let rs2 = parse_register(tokens[3])?;
            trace.funct7 = desc.funct7;
            trace.rd = Some(rd);
            trace.rs1 = Some(rs1);
            trace.rs2 = Some(rs2);
            pack_r(f7, rs2 as u32, rs1 as u32, f3, rd as u32, opcode)
        }
        Format::I => {
            expect_operands(desc, tokens, 3)?;
            let rd = parse_register(tokens[1])?;
            // `imm(rs1)` arrives as [imm, rs1]
            let (rs1_tok, imm_tok) = if parse_register(tokens[3]).is_ok() {
                (tokens[3], tokens[2])
            } else {
                (tokens[2], tokens[3])
            };
            let rs1 = parse_register(rs1_tok)?;
            let imm = if desc.op.is_shift_imm() {
                (f7 << 5) | parse_unsigned(imm_tok, 5)?
            } else {
                parse_signed(imm_tok, 12)? as u32 & 0xFFF
            };
            trace.rd = Some(rd);
            trace.rs1 = Some(rs1);
            trace.imm = Some(ImmField { bits: imm, width: 12 });
            pack_i(imm, rs1 as u32, f3, rd as u32, opcode)
        }
        Format::S => {
            expect_operands(desc, tokens, 3)?;
            let rs2 = parse_register(tokens[1])?;
            let imm = parse_signed(tokens[2], 12)? as u32 & 0xFFF;
            let rs1 = parse_register(tokens[3])?;
            trace.rs1 = Some(rs1);
            trace.rs2 = Some(rs2);
            trace.imm = Some(ImmField { bits: imm, width: 12 });
            pack_s(imm, rs2 as u32, rs1 as u32, f3, opcode)
        }
        Format::SB => {
            expect_operands(desc, tokens, 3)?;
            let rs1 = parse_register(tokens[1])?;
            let rs2 = parse_register(tokens[2])?;
            let imm = resolve_offset(tokens[3], pc, symbols, 13)? as u32 & 0x1FFF;
            trace.rs1 = Some(rs1);
            trace.rs2 = Some(rs2);
            trace.imm = Some(ImmField { bits: imm, width: 13 });
            pack_b(imm, rs2 as u32, rs1 as u32, f3, opcode)
        }
        Format::U => {
            expect_operands(desc, tokens, 2)?;
            let rd = parse_register(tokens[1])?;
            let imm = parse_unsigned(tokens[2], 20)?;
            trace.rd = Some(rd);
            trace.imm = Some(ImmField { bits: imm, width: 20 });
            pack_u(imm, rd as u32, opcode)
        }
        Format::UJ => {
            expect_operands(desc, tokens, 2)?;
            let rd = parse_register(tokens[1])?;
            let imm = resolve_offset(tokens[2], pc, symbols, 21)? as u32 & 0x1F_FFFF;
            trace.rd = Some(rd);
            trace.imm = Some(ImmField { bits: imm, width: 21 });
            pack_j(imm, rd as u32, opcode)
        }
        Format::Sys => return Err(AsmError::UnknownMnemonic(mnemonic.to_string())),
    };

    Ok(Encoded { word, trace })
}
