//! String-encoded list decoding
//!
//! Label columns arrive as Python-style literals such as `['Card Game', 'Dice']`.
//! The decoder accepts a bracketed list or a parenthesised tuple of quoted
//! strings and nothing else. Adjacent quoted strings inside one element are
//! joined, so `['a' 'b']` decodes to `["ab"]`.

use crate::error::{PredictorError, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Parse a single list literal into its ordered string elements.
///
/// Returns the reason as an error string so callers can attach the cell
/// location.
pub fn parse_list_literal(text: &str) -> std::result::Result<Vec<String>, String> {
    let mut chars = text.chars().peekable();
    skip_whitespace(&mut chars);

    let close = match chars.next() {
        Some('[') => ']',
        Some('(') => ')',
        Some(c) => return Err(format!("expected '[' or '(', found '{}'", c)),
        None => return Err("empty cell".to_string()),
    };

    let mut items = Vec::new();
    let mut trailing_comma = false;

    loop {
        skip_whitespace(&mut chars);
        match chars.peek() {
            Some(&c) if c == close => {
                chars.next();
                break;
            }
            Some('\'') | Some('"') => {
                let mut item = parse_string(&mut chars)?;
                loop {
                    skip_whitespace(&mut chars);
                    match chars.peek() {
                        Some('\'') | Some('"') => item.push_str(&parse_string(&mut chars)?),
                        _ => break,
                    }
                }
                items.push(item);
                trailing_comma = false;
            }
            Some(&c) => return Err(format!("expected a quoted string, found '{}'", c)),
            None => return Err(format!("unterminated sequence, missing '{}'", close)),
        }

        skip_whitespace(&mut chars);
        match chars.next() {
            Some(',') => trailing_comma = true,
            Some(c) if c == close => break,
            Some(c) => return Err(format!("expected ',' or '{}', found '{}'", close, c)),
            None => return Err(format!("unterminated sequence, missing '{}'", close)),
        }
    }

    skip_whitespace(&mut chars);
    if let Some(c) = chars.next() {
        return Err(format!("unexpected trailing character '{}'", c));
    }

    // ('a') is a parenthesised string in Python, not a tuple
    if close == ')' && items.len() == 1 && !trailing_comma {
        return Err("parenthesised string is not a sequence".to_string());
    }

    Ok(items)
}

/// Encode labels as a list literal that [`parse_list_literal`] reads back unchanged.
pub fn encode_list_literal(labels: &[String]) -> String {
    let quoted: Vec<String> = labels
        .iter()
        .map(|label| {
            let mut out = String::with_capacity(label.len() + 2);
            out.push('\'');
            for c in label.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    other => out.push(other),
                }
            }
            out.push('\'');
            out
        })
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Decode every cell of a label column. Any null or malformed cell aborts.
pub fn decode_list_column(column: &str, cells: &[Option<&str>]) -> Result<Vec<Vec<String>>> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let text = cell.ok_or_else(|| PredictorError::LiteralError {
                column: column.to_string(),
                row,
                cell: String::new(),
                reason: "missing value".to_string(),
            })?;
            parse_list_literal(text).map_err(|reason| PredictorError::LiteralError {
                column: column.to_string(),
                row,
                cell: text.to_string(),
                reason,
            })
        })
        .collect()
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().map_or(false, |c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_string(chars: &mut Peekable<Chars<'_>>) -> std::result::Result<String, String> {
    let quote = chars.next().ok_or("expected a quoted string")?;
    let mut out = String::new();

    loop {
        match chars.next() {
            None => return Err("unterminated string literal".to_string()),
            Some(c) if c == quote => return Ok(out),
            Some('\n') => return Err("newline inside string literal".to_string()),
            Some('\\') => match chars.next() {
                None => return Err("unterminated escape sequence".to_string()),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('x') => out.push(parse_hex_escape(chars, 2)?),
                Some('u') => out.push(parse_hex_escape(chars, 4)?),
                Some('U') => out.push(parse_hex_escape(chars, 8)?),
                // Unknown escapes keep their backslash
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
            },
            Some(c) => out.push(c),
        }
    }
}

fn parse_hex_escape(chars: &mut Peekable<Chars<'_>>, digits: usize) -> std::result::Result<char, String> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err("truncated hex escape".to_string());
    }
    let code = u32::from_str_radix(&hex, 16).map_err(|_| format!("invalid hex escape '{}'", hex))?;
    char::from_u32(code).ok_or_else(|| format!("invalid code point {:#x}", code))
}
