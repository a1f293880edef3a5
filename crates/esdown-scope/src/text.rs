//! Token-level scanning over raw source text.
//!
//! The syntax tree does not record the position of punctuation such as
//! `{`, `=>` or a trailing `,`. These helpers find them by scanning the
//! text between two known node boundaries, skipping whitespace and comments.

/// Skip whitespace and comments starting at `from`.
pub fn skip_trivia(source: &str, from: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match source[i + 2..].find("*/") {
                    Some(end) => i + 2 + end + 2,
                    None => bytes.len(),
                };
            }
            b if b >= 0x80 => {
                // Unicode whitespace (NBSP, line separators, BOM)
                match source[i..].chars().next() {
                    Some(c) if c.is_whitespace() || c == '\u{feff}' => i += c.len_utf8(),
                    _ => break,
                }
            }
            _ => break,
        }
    }
    i
}

/// Position of the first occurrence of `token` in `[from, to)` that is not
/// inside a comment. Only meaningful over text made of punctuation and
/// trivia.
pub fn find_token(source: &str, from: usize, to: usize, token: &str) -> Option<usize> {
    let mut i = from;
    loop {
        i = skip_trivia(source, i);
        if i >= to {
            return None;
        }
        if source[i..].starts_with(token) {
            return Some(i);
        }
        i += source[i..].chars().next().map_or(1, char::len_utf8);
    }
}

/// Position of the next significant character at or after `from`, if it is
/// `expected`.
pub fn next_is(source: &str, from: usize, expected: char) -> Option<usize> {
    let i = skip_trivia(source, from);
    source[i..].starts_with(expected).then_some(i)
}

/// Turn arbitrary property-key text into something usable inside an
/// identifier: every character that cannot appear in one becomes `_`.
pub fn sanitize_identifier(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// A `"use strict"` directive, with either quote style.
pub fn is_use_strict(raw: &str) -> bool {
    raw == "\"use strict\"" || raw == "'use strict'"
}
