//! Bit-level helpers shared by the assembler, the decoder and the trace output.

use bitvec::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    #[error("malformed number `{0}`")]
    Malformed(String),
    #[error("value `{text}` out of range [{min}, {max}]")]
    OutOfRange { text: String, min: i128, max: i128 },
}

/// Notation a literal was written in. Hex and binary literals may use the
/// full unsigned range of a directive, decimal and character literals only
/// the signed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Hex,
    Binary,
    Char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub value: i128,
    pub radix: Radix,
}

/// Extracts bits `hi..=lo` of `word`, right-aligned.
pub fn field(word: u32, hi: u32, lo: u32) -> u32 {
    debug_assert!(hi >= lo && hi < 32);
    word.view_bits::<Lsb0>()[lo as usize..=hi as usize].load_le::<u32>()
}

/// Sign-extends the low `bits` bits of `value`.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Renders the low `width` bits of `value` as a binary string, MSB first.
pub fn to_bin(value: u32, width: usize) -> String {
    value.view_bits::<Lsb0>()[..width]
        .iter()
        .rev()
        .map(|bit| if *bit { '1' } else { '0' })
        .collect()
}

/// `0x` + uppercase hex, no padding. Used for addresses in the trace format.
pub fn hex_addr(addr: u32) -> String {
    format!("0x{addr:X}")
}

/// `0x` + eight uppercase hex digits.
pub fn hex_word(word: u32) -> String {
    format!("0x{word:08X}")
}

pub fn hex_byte(byte: u8) -> String {
    format!("{byte:02X}")
}

/// Parses a hex number with or without a `0x` prefix.
pub fn parse_hex(text: &str) -> Result<u32, NumberError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NumberError::Malformed(text.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| NumberError::OutOfRange {
        text: text.to_string(),
        min: 0,
        max: u32::MAX as i128,
    })
}

/// Parses a numeric literal: decimal, `0x` hex, `0b` binary or a
/// single-character literal `'c'`. A `-` sign is accepted only as the
/// first character.
pub fn parse_literal(text: &str) -> Result<Literal, NumberError> {
    let malformed = || NumberError::Malformed(text.to_string());

    if text.starts_with('\'') {
        let mut chars = text.chars();
        return match (chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some('\''), Some(c), Some('\''), None) => Ok(Literal {
                value: c as i128,
                radix: Radix::Char,
            }),
            _ => Err(malformed()),
        };
    }

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (radix, digits) = if let Some(d) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (Radix::Hex, d)
    } else if let Some(d) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (Radix::Binary, d)
    } else {
        (Radix::Decimal, body)
    };
    let base = match radix {
        Radix::Hex => 16,
        Radix::Binary => 2,
        _ => 10,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
        return Err(malformed());
    }
    let magnitude = u64::from_str_radix(digits, base).map_err(|_| NumberError::OutOfRange {
        text: text.to_string(),
        min: -(1i128 << 63),
        max: u64::MAX as i128,
    })? as i128;

    Ok(Literal {
        value: if negative { -magnitude } else { magnitude },
        radix,
    })
}

fn ensure_range(text: &str, value: i128, min: i128, max: i128) -> Result<i128, NumberError> {
    if value < min || value > max {
        return Err(NumberError::OutOfRange {
            text: text.to_string(),
            min,
            max,
        });
    }
    Ok(value)
}

/// Parses `text` as a two's complement immediate of `bits` bits.
pub fn parse_signed(text: &str, bits: u32) -> Result<i32, NumberError> {
    let lit = parse_literal(text)?;
    let half = 1i128 << (bits - 1);
    ensure_range(text, lit.value, -half, half - 1).map(|v| v as i32)
}

/// Parses `text` as an unsigned field of `bits` bits.
pub fn parse_unsigned(text: &str, bits: u32) -> Result<u32, NumberError> {
    let lit = parse_literal(text)?;
    ensure_range(text, lit.value, 0, (1i128 << bits) - 1).map(|v| v as u32)
}

/// Range-checks a data literal against a `bits`-wide slot and returns its
/// two's complement bit pattern.
pub fn fit_data(text: &str, lit: Literal, bits: u32) -> Result<u64, NumberError> {
    let half = 1i128 << (bits - 1);
    let max = match lit.radix {
        Radix::Hex | Radix::Binary => (1i128 << bits) - 1,
        Radix::Decimal | Radix::Char => half - 1,
    };
    let value = ensure_range(text, lit.value, -half, max)?;
    let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    Ok((value as u64) & mask)
}

pub fn fits_signed(value: i128, bits: u32) -> bool {
    let half = 1i128 << (bits - 1);
    (-half..half).contains(&value)
}
