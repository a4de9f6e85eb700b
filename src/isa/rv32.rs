use crate::bits::{field, sign_extend};
use crate::decoder::{DecodeError, Decoded, Decoder, Op};
use crate::instructions::{self, Format, HALT_WORD, OPCODE_SYSTEM};

/// RV32I base subset plus `mul`/`div`/`rem`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rv32Decoder;

impl Rv32Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Rv32Decoder {
    fn decode(&self, word: u32) -> Result<Decoded, DecodeError> {
        if word == HALT_WORD {
            return Ok(Decoded {
                word,
                op: Op::Ecall,
                format: Format::Sys,
                opcode: OPCODE_SYSTEM,
                funct3: None,
                funct7: None,
                rd: None,
                rs1: None,
                rs2: None,
                imm: 0,
            });
        }

        let opcode = field(word, 6, 0) as u8;
        let funct3 = field(word, 14, 12) as u8;
        let funct7 = field(word, 31, 25) as u8;
        let rd = field(word, 11, 7) as u8;
        let rs1 = field(word, 19, 15) as u8;
        let rs2 = field(word, 24, 20) as u8;

        let desc = match instructions::classify(opcode, funct3, funct7) {
            Some(desc) => desc,
            None => {
                return Err(match instructions::unsupported(opcode, funct3) {
                    Some(mnemonic) => DecodeError::Unsupported { word, mnemonic },
                    None => DecodeError::Illegal { word },
                })
            }
        };

        let mut d = Decoded {
            word,
            op: desc.op,
            format: desc.format,
            opcode,
            funct3: Some(funct3),
            funct7: None,
            rd: None,
            rs1: None,
            rs2: None,
            imm: 0,
        };

        match desc.format {
            Format::R => {
                d.funct7 = Some(funct7);
                d.rd = Some(rd);
                d.rs1 = Some(rs1);
                d.rs2 = Some(rs2);
            }
            Format::I => {
                d.rd = Some(rd);
                d.rs1 = Some(rs1);
                if desc.op.is_shift_imm() {
                    d.funct7 = Some(funct7);
                    d.imm = field(word, 24, 20) as i32;
                } else {
                    d.imm = sign_extend(field(word, 31, 20), 12);
                }
            }
            Format::S => {
                d.rs1 = Some(rs1);
                d.rs2 = Some(rs2);
                let raw = (field(word, 31, 25) << 5) | field(word, 11, 7);
                d.imm = sign_extend(raw, 12);
            }
            Format::SB => {
                d.rs1 = Some(rs1);
                d.rs2 = Some(rs2);
                let raw = (field(word, 31, 31) << 12)
                    | (field(word, 7, 7) << 11)
                    | (field(word, 30, 25) << 5)
                    | (field(word, 11, 8) << 1);
                d.imm = sign_extend(raw, 13);
            }
            Format::U => {
                d.funct3 = None;
                d.rd = Some(rd);
                d.imm = (field(word, 31, 12) << 12) as i32;
            }
            Format::UJ => {
                d.funct3 = None;
                d.rd = Some(rd);
                let raw = (field(word, 31, 31) << 20)
                    | (field(word, 19, 12) << 12)
                    | (field(word, 20, 20) << 11)
                    | (field(word, 30, 21) << 1);
                d.imm = sign_extend(raw, 21);
            }
            Format::Sys => return Err(DecodeError::Illegal { word }),
        }
        Ok(d)
    }
}
