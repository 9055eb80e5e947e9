//! ASCII scalar encoding
//!
//! Text tokens as they appear in an ASCII data section. Integers are
//! decimal, floats use the shortest representation that round-trips (or the
//! definition's printf format string), strings are quoted when they would
//! otherwise not survive whitespace tokenizing.
//!
//! ## Quoting Rules
//! A token is wrapped in double quotes when it is empty, contains whitespace,
//! a double quote, a backslash or a control character, or starts with `!`
//! (the comment marker). Inside quotes `"` and `\` are backslash escaped and
//! control characters use `\n`, `\r`, `\t`, `\0` or a three-digit octal escape.

use std::borrow::Cow;

use crate::error::{Result, SddsError};

use super::{DataType, FormatSpec, Value};

// =============================================================================
// Encoding
// =============================================================================

/// Plain text of a value, without quoting
pub fn encode_plain(value: &Value) -> String {
    match value {
        Value::LongDouble(v) | Value::Double(v) => format!("{:?}", v),
        Value::Float(v) => format!("{:?}", v),
        Value::Long64(v) => v.to_string(),
        Value::ULong64(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::ULong(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::UShort(v) => v.to_string(),
        Value::String(s) => s.clone(),
        Value::Character(c) => (*c as char).to_string(),
    }
}

/// Token for a value as written to an ASCII data section
///
/// When a format spec is given it replaces the default text; the result is
/// still quoted if it would not read back as a single token.
pub fn encode_token(value: &Value, format: Option<&FormatSpec>) -> String {
    let text = match format {
        Some(spec) => spec.format(value),
        None => encode_plain(value),
    };
    match value {
        Value::String(_) | Value::Character(_) => quote_if_needed(&text).into_owned(),
        _ => text.trim().to_string(),
    }
}

/// True when a string must be quoted to read back as one token
pub fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.starts_with('!')
        || s.chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\' || c.is_control())
}

/// Quote and escape a string if [`needs_quotes`] says so
pub fn quote_if_needed(s: &str) -> Cow<'_, str> {
    if !needs_quotes(s) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() && (c as u32) < 0o400 => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

// =============================================================================
// Decoding
// =============================================================================

/// Split the first whitespace-delimited token off `line`
///
/// Returns the raw token (quotes included) and the remainder, or `None` when
/// only whitespace is left.
pub fn split_token(line: &str) -> Result<Option<(&str, &str)>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some(body) = trimmed.strip_prefix('"') {
        let mut escaped = false;
        for (i, c) in body.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    let end = 1 + i + 1;
                    return Ok(Some((&trimmed[..end], &trimmed[end..])));
                }
                _ => {}
            }
        }
        return Err(SddsError::Format(format!(
            "Unterminated quoted token: {}",
            trimmed
        )));
    }

    let end = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    Ok(Some((&trimmed[..end], &trimmed[end..])))
}

/// Strip quotes from a raw token and resolve escapes
///
/// Unquoted tokens are returned unchanged.
pub fn unquote(raw: &str) -> Result<String> {
    let body = match raw.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"').ok_or_else(|| {
            SddsError::Format(format!("Unterminated quoted token: {}", raw))
        })?,
        None => return Ok(raw.to_string()),
    };

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(d @ '0'..='7') => {
                let mut code = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            code = code * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or('\0'));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Ok(out)
}

/// Parse an unquoted token as a value of the given kind
pub fn decode_token(token: &str, data_type: DataType) -> Result<Value> {
    let bad = |reason: &dyn std::fmt::Display| {
        SddsError::Format(format!(
            "Invalid {} value {:?}: {}",
            data_type.short_name(),
            token,
            reason
        ))
    };

    let value = match data_type {
        DataType::LongDouble => Value::LongDouble(token.parse().map_err(|e| bad(&e))?),
        DataType::Double => Value::Double(token.parse().map_err(|e| bad(&e))?),
        DataType::Float => Value::Float(token.parse().map_err(|e| bad(&e))?),
        DataType::Long64 => Value::Long64(token.parse().map_err(|e| bad(&e))?),
        DataType::ULong64 => Value::ULong64(token.parse().map_err(|e| bad(&e))?),
        DataType::Long => Value::Long(token.parse().map_err(|e| bad(&e))?),
        DataType::ULong => Value::ULong(token.parse().map_err(|e| bad(&e))?),
        DataType::Short => Value::Short(token.parse().map_err(|e| bad(&e))?),
        DataType::UShort => Value::UShort(token.parse().map_err(|e| bad(&e))?),
        DataType::String => Value::String(token.to_string()),
        DataType::Character => {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::character(c).map_err(|e| bad(&e))?,
                _ => return Err(bad(&"expected a single character")),
            }
        }
    };
    Ok(value)
}
