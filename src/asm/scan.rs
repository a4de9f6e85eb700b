//! First pass: segment tracking, address assignment and label collection.

use std::collections::HashSet;

use super::error::AsmError;
use super::lexer::{is_valid_label, split_label, strip_comment};
use super::SymbolTable;
use crate::memory::TEXT_BASE;

/// A source line that produces output, with comment and label removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    pub number: usize,
    /// Text address; unused for data lines.
    pub address: u32,
    /// Data labels waiting for their address.
    pub labels: Vec<&'a str>,
    pub body: &'a str,
}

#[derive(Debug, Default)]
pub(crate) struct Scanned<'a> {
    pub text: Vec<Line<'a>>,
    pub data: Vec<Line<'a>>,
    /// Text labels; data labels are added once data is laid out.
    pub symbols: SymbolTable,
    /// Address following the last instruction.
    pub end: u32,
}

pub(crate) fn scan(source: &str) -> Result<Scanned<'_>, AsmError> {
    let mut out = Scanned {
        end: TEXT_BASE,
        ..Default::default()
    };
    let mut seen = HashSet::new();
    let mut in_data = false;

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let (label, body) = split_label(line);
        let body = body.trim();

        if let Some(name) = label {
            if !is_valid_label(name) {
                return Err(AsmError::InvalidLabel(name.to_string()).at(number));
            }
            if !seen.insert(name) {
                return Err(AsmError::DuplicateLabel(name.to_string()).at(number));
            }
        }

        match body.split_whitespace().next() {
            Some(".data") => {
                in_data = true;
                continue;
            }
            Some(".text") => {
                in_data = false;
                continue;
            }
            _ => {}
        }

        if in_data {
            // label-only lines keep an empty body so the label still gets
            // the address of whatever data follows
            out.data.push(Line {
                number,
                address: 0,
                labels: label.into_iter().collect(),
                body,
            });
        } else {
            // a label names the next instruction, on this line or later
            if let Some(name) = label {
                out.symbols.insert(name.to_string(), out.end);
            }
            if !body.is_empty() {
                out.text.push(Line {
                    number,
                    address: out.end,
                    labels: Vec::new(),
                    body,
                });
                out.end += 4;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_and_labels() {
        let src = "start: addi x1, x0, 1\n\
                   # comment\n\
                   \n\
                   loop:\n\
                   \tadd x2, x2, x1\n\
                   done: beq x0, x0, loop\n";
        let s = scan(src).unwrap();
        assert_eq!(s.text.iter().map(|l| l.address).collect::<Vec<_>>(), vec![0, 4, 8]);
        assert_eq!(s.symbols.get("start"), Some(&0));
        assert_eq!(s.symbols.get("loop"), Some(&4));
        assert_eq!(s.symbols.get("done"), Some(&8));
        assert_eq!(s.end, 12);
    }

    #[test]
    fn data_lines_are_deferred() {
        let src = ".data\nnum: .word 8\n.text\nlui x5, 0x10000\n";
        let s = scan(src).unwrap();
        assert_eq!(s.data.len(), 1);
        assert_eq!(s.data[0].labels, vec!["num"]);
        assert_eq!(s.text[0].address, 0);
        assert!(s.symbols.get("num").is_none());
    }

    #[test]
    fn duplicate_label_reports_line() {
        let err = scan("a: addi x1, x0, 1\na: addi x1, x0, 2\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.kind(), &AsmError::DuplicateLabel("a".into()));
    }
}
