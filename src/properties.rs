//! Reading and writing Java-style `.properties` documents.
//!
//! Supported syntax:
//!
//! - comment lines starting with `#` or `!` (after optional whitespace);
//! - `key=value`, `key: value` or `key value`;
//! - a line ending in an odd number of backslashes continues on the next line,
//!   whose leading whitespace is dropped;
//! - escapes `\t`, `\n`, `\r`, `\f`, `\uXXXX`, and `\<char>` for any other char.
//!
//! Content is read as UTF-8. `${...}` and `ENC(...)` are ordinary text here.

use crate::{PropCryptError, PropertyMap, Result};

/// Parses `content` into `(key, value)` pairs in document order.
///
/// Later duplicates are kept; inserting the pairs into a map makes the last
/// definition win.
pub fn parse(content: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    let mut logical = String::new();
    let mut start_line = 0;
    let mut continuing = false;

    for (index, raw) in content.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = line.trim_start_matches(is_whitespace);

        if !continuing {
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            start_line = index + 1;
        }

        if ends_with_continuation(trimmed) {
            logical.push_str(&trimmed[..trimmed.len() - 1]);
            continuing = true;
            continue;
        }

        logical.push_str(trimmed);
        continuing = false;
        entries.push(parse_entry(&logical, start_line)?);
        logical.clear();
    }

    if continuing {
        entries.push(parse_entry(&logical, start_line)?);
    }

    Ok(entries)
}

/// Parses `content` and inserts every entry into `properties`, prefixing keys
/// with `key_prefix` when one is given. Returns the number of entries read.
pub fn load_into(
    content: &str,
    properties: &mut PropertyMap,
    key_prefix: Option<&str>,
) -> Result<usize> {
    let entries = parse(content)?;
    let count = entries.len();
    for (key, value) in entries {
        let key = match key_prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key,
        };
        properties.insert(key, value);
    }
    Ok(count)
}

/// Renders `properties` as a `.properties` document, one entry per line.
pub fn write(properties: &PropertyMap) -> String {
    let mut output = String::new();
    for (key, value) in properties {
        output.push_str(&escape(key, true));
        output.push('=');
        output.push_str(&escape(value, false));
        output.push('\n');
    }
    output
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn parse_entry(line: &str, line_number: usize) -> Result<(String, String)> {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            c if is_whitespace(c) => {
                key_end = i;
                value_start = skip_separator(line, i);
                break;
            }
            _ => {}
        }
    }

    let value = line[value_start..].trim_start_matches(is_whitespace);
    Ok((
        unescape(&line[..key_end], line_number)?,
        unescape(value, line_number)?,
    ))
}

/// From the whitespace ending a key, skips that whitespace and at most one
/// `=` or `:` after it.
fn skip_separator(line: &str, from: usize) -> usize {
    let rest = &line[from..];
    let after_ws = rest.trim_start_matches(is_whitespace);
    let offset = from + (rest.len() - after_ws.len());
    match after_ws.chars().next() {
        Some('=') | Some(':') => offset + 1,
        _ => offset,
    }
}

fn unescape(text: &str, line_number: usize) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => output.push('\t'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('f') => output.push('\u{c}'),
            Some('u') => {
                let digits: String = chars.by_ref().take(4).collect();
                let decoded = (digits.len() == 4)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| PropCryptError::MalformedProperties {
                        line: line_number,
                        reason: format!("malformed \\uxxxx encoding '\\u{}'", digits),
                    })?;
                output.push(decoded);
            }
            Some(other) => output.push(other),
            None => {}
        }
    }

    Ok(output)
}

fn escape(text: &str, is_key: bool) -> String {
    let mut output = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => output.push_str("\\\\"),
            '\t' => output.push_str("\\t"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\u{c}' => output.push_str("\\f"),
            ' ' if is_key || i == 0 => output.push_str("\\ "),
            '=' | ':' | '#' | '!' if is_key => {
                output.push('\\');
                output.push(c);
            }
            _ => output.push(c),
        }
    }
    output
}
