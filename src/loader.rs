//! Reads the assembler's machine-code listing back into a loadable image.
//!
//! Text lines look like `0x4 0x00A30313 , addi x6, x6, 10 # ...`; only the
//! first two fields matter. A blank line separates them from data lines
//! such as `0x10000000 2A`.

use serde::Serialize;

use crate::asm::Program;
use crate::bits::parse_hex;
use crate::cpu::Trap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Image {
    pub text: Vec<(u32, u32)>,
    pub data: Vec<(u32, u8)>,
}

impl Image {
    pub fn parse(source: &str) -> Result<Image, Trap> {
        let mut image = Image::default();
        let mut in_data = false;

        for (idx, line) in source.lines().enumerate() {
            let malformed = || Trap::MalformedImage {
                line: idx + 1,
                text: line.to_string(),
            };
            let mut fields = line.split_whitespace();
            let Some(first) = fields.next() else {
                in_data = true;
                continue;
            };
            let addr = parse_hex(first).map_err(|_| malformed())?;
            let value = fields.next().ok_or_else(malformed)?;

            if in_data {
                if fields.next().is_some() || value.len() > 2 {
                    return Err(malformed());
                }
                let byte = parse_hex(value).map_err(|_| malformed())?;
                image.data.push((addr, byte as u8));
            } else {
                let word = parse_hex(value).map_err(|_| malformed())?;
                image.text.push((addr, word));
            }
        }
        Ok(image)
    }
}

impl From<&Program> for Image {
    fn from(program: &Program) -> Self {
        let mut text: Vec<(u32, u32)> = program.text.iter().map(|r| (r.address, r.word)).collect();
        text.push((program.halt_address, crate::instructions::HALT_WORD));
        Image {
            text,
            data: program.data.iter().map(|d| (d.address, d.byte)).collect(),
        }
    }
}
