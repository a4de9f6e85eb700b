//! Line-level tokenizing shared by both passes.

/// Cuts a `#` comment off, ignoring `#` inside string or character literals.
pub fn strip_comment(line: &str) -> &str {
    let mut in_str = false;
    let mut in_char = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_str || in_char => escaped = true,
            '"' if !in_char => in_str = !in_str,
            '\'' if !in_str => in_char = !in_char,
            '#' if !in_str && !in_char => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Splits `label: rest`. Only a colon before any quote counts.
pub fn split_label(line: &str) -> (Option<&str>, &str) {
    for (i, c) in line.char_indices() {
        match c {
            '"' | '\'' => break,
            ':' => return (Some(line[..i].trim()), &line[i + 1..]),
            _ => {}
        }
    }
    (None, line)
}

pub fn is_valid_label(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

/// Splits operands on whitespace, commas and parentheses. A character
/// literal stays one token even when it quotes a separator.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        if quoted {
            if c == '\'' {
                quoted = false;
            }
            continue;
        }
        if c.is_whitespace() || matches!(c, ',' | '(' | ')') {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
        } else {
            start.get_or_insert(i);
            if c == '\'' {
                quoted = true;
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}
