//! Data-segment directives.

use super::error::AsmError;
use super::lexer::tokenize;
use crate::bits::{fit_data, parse_literal};

fn slot_bits(directive: &str) -> Option<u32> {
    match directive {
        ".byte" => Some(8),
        ".half" | ".halfword" => Some(16),
        ".word" => Some(32),
        ".dword" | ".double" | ".doubleword" => Some(64),
        _ => None,
    }
}

/// Expands one data line (comment already stripped) into bytes, most
/// significant byte first.
pub fn expand(line: &str) -> Result<Vec<u8>, AsmError> {
    let line = line.trim();
    let (directive, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    if directive == ".asciz" {
        return parse_string(rest.trim());
    }
    let bits = slot_bits(directive).ok_or_else(|| AsmError::UnknownMnemonic(directive.to_string()))?;

    let mut bytes = Vec::new();
    for token in tokenize(rest) {
        let value = fit_data(token, parse_literal(token)?, bits)?;
        let be = value.to_be_bytes();
        bytes.extend_from_slice(&be[be.len() - (bits / 8) as usize..]);
    }
    Ok(bytes)
}

/// Bytes of a double-quoted string. No terminator is appended.
fn parse_string(text: &str) -> Result<Vec<u8>, AsmError> {
    let body = text
        .strip_prefix('"')
        .ok_or_else(|| AsmError::UnexpectedText(text.to_string()))?;

    let mut bytes = Vec::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                let trailing = body[i + 1..].trim();
                if !trailing.is_empty() {
                    return Err(AsmError::UnexpectedText(trailing.to_string()));
                }
                return Ok(bytes);
            }
            '\\' => {
                let escaped = match chars.next() {
                    Some((_, 'n')) => b'\n',
                    Some((_, 't')) => b'\t',
                    Some((_, 'r')) => b'\r',
                    Some((_, '\\')) => b'\\',
                    Some((_, '"')) => b'"',
                    Some((_, other)) => return Err(AsmError::InvalidEscapeSequence(other)),
                    None => break,
                };
                bytes.push(escaped);
            }
            c => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    // no closing quote
    Err(AsmError::UnexpectedText(text.to_string()))
}
