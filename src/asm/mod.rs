//! Two-pass assembler producing the annotated machine-code listing.
//!
//! Pass one assigns text addresses and collects labels; pass two lays out
//! the data segment, then encodes every instruction and finally appends
//! the halt word.

mod directive;
mod encoder;
mod error;
pub(crate) mod lexer;
mod scan;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::bits::{hex_addr, hex_byte, hex_word};
use crate::instructions::HALT_WORD;
use crate::memory::DATA_BASE;

pub use directive::expand as expand_directive;
pub use encoder::{encode, parse_register, Encoded, ImmField, TraceFields};
pub use error::AsmError;

/// Label name to byte address.
pub type SymbolTable = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRecord {
    pub address: u32,
    pub word: u32,
    pub source: String,
    pub trace: TraceFields,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataRecord {
    pub address: u32,
    pub byte: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub text: Vec<TextRecord>,
    /// Address of the appended halt word.
    pub halt_address: u32,
    pub data: Vec<DataRecord>,
    pub symbols: SymbolTable,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.text {
            writeln!(
                f,
                "{} {} , {} # {}",
                hex_addr(r.address),
                hex_word(r.word),
                r.source,
                r.trace
            )?;
        }
        writeln!(
            f,
            "{} {} , end of file # exit",
            hex_addr(self.halt_address),
            hex_word(HALT_WORD)
        )?;
        writeln!(f)?;
        for d in &self.data {
            writeln!(f, "{} {}", hex_addr(d.address), hex_byte(d.byte))?;
        }
        Ok(())
    }
}

pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let scanned = scan::scan(source)?;
    let mut symbols = scanned.symbols;

    let mut data = Vec::new();
    let mut cursor = DATA_BASE;
    for line in &scanned.data {
        for label in &line.labels {
            symbols.insert(label.to_string(), cursor);
        }
        if line.body.is_empty() {
            continue;
        }
        let bytes = directive::expand(line.body).map_err(|e| e.at(line.number))?;
        for byte in bytes {
            data.push(DataRecord { address: cursor, byte });
            cursor = cursor.wrapping_add(1);
        }
    }

    let mut text = Vec::with_capacity(scanned.text.len());
    for line in &scanned.text {
        let tokens = lexer::tokenize(line.body);
        let encoded = encoder::encode(&tokens, line.address, &symbols).map_err(|e| e.at(line.number))?;
        debug!(
            address = format_args!("{:#x}", line.address),
            word = format_args!("{:#010x}", encoded.word),
            "encoded"
        );
        text.push(TextRecord {
            address: line.address,
            word: encoded.word,
            source: line.body.to_string(),
            trace: encoded.trace,
            line: line.number,
        });
    }

    Ok(Program {
        text,
        halt_address: scanned.end,
        data,
        symbols,
    })
}
