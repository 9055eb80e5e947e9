//! Header namelists
//!
//! Every header record is a namelist group:
//!
//! ```text
//! &column name=x, units=m, type=double, &end
//! ```
//!
//! Values that contain whitespace, commas, quotes, `&` or `=` (or are empty)
//! are double quoted with `"` and `\` escaped.

use crate::error::{Result, SddsError};

/// One `&group key=value, ... &end` record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namelist {
    pub group: String,
    pub fields: Vec<(String, String)>,
}

impl Namelist {
    pub fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            fields: Vec::new(),
        }
    }

    /// Add a field unconditionally
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    /// Add a field only when the value is non-empty
    pub fn optional(self, key: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.field(key, value)
        }
    }

    /// Value of a key (last occurrence wins)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Render as one header line, newline included
    pub fn to_line(&self) -> String {
        let mut line = format!("&{}", self.group);
        for (key, value) in &self.fields {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(&quote(value));
            line.push(',');
        }
        line.push_str(" &end\n");
        line
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '"' | '\\' | '&' | '=' | '!'))
}

fn quote(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// =============================================================================
// Parsing
// =============================================================================

/// True once `text` holds a complete group, i.e. an unquoted `&end`
pub fn is_complete(text: &str) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '&' if !in_quotes && text[i + 1..].starts_with("end") => return true,
            _ => {}
        }
    }
    false
}

/// Parse one complete group
pub fn parse(text: &str) -> Result<Namelist> {
    let bad = |reason: &str| SddsError::Format(format!("Invalid namelist {:?}: {}", text.trim(), reason));

    let mut chars = text.chars().peekable();
    skip_separators(&mut chars);
    if chars.next() != Some('&') {
        return Err(bad("expected '&'"));
    }
    let group = take_word(&mut chars);
    if group.is_empty() || group.eq_ignore_ascii_case("end") {
        return Err(bad("missing group name"));
    }

    let mut namelist = Namelist::new(&group);
    loop {
        skip_separators(&mut chars);
        match chars.peek() {
            None => return Err(bad("missing &end")),
            Some('&') => {
                chars.next();
                let word = take_word(&mut chars);
                if word.eq_ignore_ascii_case("end") {
                    return Ok(namelist);
                }
                return Err(bad(&format!("unexpected &{}", word)));
            }
            Some(_) => {}
        }

        let key = take_word(&mut chars);
        skip_whitespace(&mut chars);
        if key.is_empty() || chars.next() != Some('=') {
            return Err(bad("expected key=value"));
        }
        skip_whitespace(&mut chars);

        let value = if chars.peek() == Some(&'"') {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    None => return Err(bad("unterminated quoted value")),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some(c) => value.push(c),
                        None => return Err(bad("unterminated quoted value")),
                    },
                    Some(c) => value.push(c),
                }
            }
            value
        } else {
            let mut value = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' || c == '&' || c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value
        };

        namelist.fields.push((key.to_ascii_lowercase(), value));
    }
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn skip_whitespace(chars: &mut Chars<'_>) {
    while chars.peek().map_or(false, |c| c.is_whitespace()) {
        chars.next();
    }
}

fn skip_separators(chars: &mut Chars<'_>) {
    while chars.peek().map_or(false, |c| c.is_whitespace() || *c == ',') {
        chars.next();
    }
}

fn take_word(chars: &mut Chars<'_>) -> String {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}
