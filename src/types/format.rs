//! printf-style format strings
//!
//! Definitions may carry a format string such as `%10.4lf` that controls how
//! values are printed in ASCII data sections. A format string holds exactly
//! one conversion, optionally surrounded by literal text:
//!
//! ```text
//! [prefix] % [flags -+ 0#] [width] [.precision] [h hh l ll L] conv [suffix]
//!
//! conv:  d i u o x X   integers
//!        e E f F g G   floats
//!        s             strings
//!        c             characters
//! ```
//!
//! Length modifiers are accepted and ignored; the value's own width decides.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};

use super::{ascii, DataType, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
}

/// A parsed format string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    source: String,
    prefix: String,
    suffix: String,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

impl FormatSpec {
    /// Parse a format string
    pub fn parse(source: &str) -> Result<Self> {
        let bad = |reason: &str| SddsError::Format(format!("Invalid format string {:?}: {}", source, reason));

        let chars: Vec<char> = source.chars().collect();
        let mut prefix = String::new();
        let mut i = 0;

        // literal text up to the conversion
        loop {
            match chars.get(i) {
                None => return Err(bad("no conversion")),
                Some('%') if chars.get(i + 1) == Some(&'%') => {
                    prefix.push('%');
                    i += 2;
                }
                Some('%') => {
                    i += 1;
                    break;
                }
                Some(c) => {
                    prefix.push(*c);
                    i += 1;
                }
            }
        }

        let mut flags = Flags::default();
        while let Some(c) = chars.get(i) {
            match c {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '0' => flags.zero = true,
                '#' => flags.alternate = true,
                _ => break,
            }
            i += 1;
        }

        let width = take_number(&chars, &mut i);
        let precision = if chars.get(i) == Some(&'.') {
            i += 1;
            Some(take_number(&chars, &mut i).unwrap_or(0))
        } else {
            None
        };

        while let Some('h' | 'l' | 'L' | 'q' | 'j' | 'z' | 't') = chars.get(i) {
            i += 1;
        }

        let conversion = match chars.get(i) {
            Some(c @ ('d' | 'i' | 'u' | 'o' | 'x' | 'X' | 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 's' | 'c')) => *c,
            Some(c) => return Err(bad(&format!("unsupported conversion '{}'", c))),
            None => return Err(bad("incomplete conversion")),
        };
        i += 1;

        let mut suffix = String::new();
        while let Some(c) = chars.get(i) {
            if *c == '%' {
                if chars.get(i + 1) == Some(&'%') {
                    suffix.push('%');
                    i += 2;
                    continue;
                }
                return Err(bad("more than one conversion"));
            }
            suffix.push(*c);
            i += 1;
        }

        Ok(Self {
            source: source.to_string(),
            prefix,
            suffix,
            flags,
            width,
            precision,
            conversion,
        })
    }

    /// The original format string
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Conversion character
    pub fn conversion(&self) -> char {
        self.conversion
    }

    /// True when this conversion can print values of `data_type`
    pub fn accepts(&self, data_type: DataType) -> bool {
        match self.conversion {
            'd' | 'i' | 'u' | 'o' | 'x' | 'X' => data_type.is_integer(),
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' => data_type.is_float(),
            's' => data_type == DataType::String,
            'c' => data_type == DataType::Character,
            _ => false,
        }
    }

    /// Print a value
    ///
    /// Values the conversion cannot represent fall back to their plain text.
    pub fn format(&self, value: &Value) -> String {
        let (sign, body) = match self.conversion {
            'd' | 'i' | 'u' => match integer_parts(value) {
                Some((negative, magnitude)) => {
                    (self.sign(negative), self.min_digits(magnitude.to_string()))
                }
                None => return self.wrap(&ascii::encode_plain(value)),
            },
            'o' | 'x' | 'X' => match unsigned_bits(value) {
                Some(bits) => {
                    let digits = match self.conversion {
                        'o' => format!("{:o}", bits),
                        'x' => format!("{:x}", bits),
                        _ => format!("{:X}", bits),
                    };
                    let digits = self.min_digits(digits);
                    let body = match (self.flags.alternate, self.conversion) {
                        (true, 'o') if !digits.starts_with('0') => format!("0{}", digits),
                        (true, 'x') if bits != 0 => format!("0x{}", digits),
                        (true, 'X') if bits != 0 => format!("0X{}", digits),
                        _ => digits,
                    };
                    ("", body)
                }
                None => return self.wrap(&ascii::encode_plain(value)),
            },
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' => match value.as_f64() {
                Some(v) => (
                    self.sign(v.is_sign_negative() && !v.is_nan()),
                    self.float_body(v.abs()),
                ),
                None => return self.wrap(&ascii::encode_plain(value)),
            },
            'c' => match value {
                Value::Character(c) => ("", (*c as char).to_string()),
                other => ("", ascii::encode_plain(other)),
            },
            _ => {
                let text = ascii::encode_plain(value);
                let text = match self.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                };
                ("", text)
            }
        };

        self.wrap(&self.pad(sign, &body))
    }

    fn wrap(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        }
    }

    fn min_digits(&self, digits: String) -> String {
        match self.precision {
            Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
            _ => digits,
        }
    }

    fn pad(&self, sign: &str, body: &str) -> String {
        let len = sign.len() + body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{}{}", sign, body);
        }
        let fill = width - len;
        let numeric = !matches!(self.conversion, 's' | 'c');
        let finite = body.chars().next().map_or(false, |c| c.is_ascii_digit());
        if self.flags.left {
            format!("{}{}{}", sign, body, " ".repeat(fill))
        } else if self.flags.zero && numeric && finite {
            // integer precision disables zero padding, as in C
            let int_with_precision = self.precision.is_some()
                && matches!(self.conversion, 'd' | 'i' | 'u' | 'o' | 'x' | 'X');
            if int_with_precision {
                format!("{}{}{}", " ".repeat(fill), sign, body)
            } else {
                let (radix_prefix, digits) = split_radix_prefix(body);
                format!("{}{}{}{}", sign, radix_prefix, "0".repeat(fill), digits)
            }
        } else {
            format!("{}{}{}", " ".repeat(fill), sign, body)
        }
    }

    fn float_body(&self, v: f64) -> String {
        let upper = self.conversion.is_ascii_uppercase();
        if !v.is_finite() {
            let text = if v.is_nan() { "nan" } else { "inf" };
            return if upper { text.to_ascii_uppercase() } else { text.to_string() };
        }

        let precision = self.precision.unwrap_or(6);
        let body = match self.conversion.to_ascii_lowercase() {
            'f' => {
                let text = format!("{:.*}", precision, v);
                if self.flags.alternate && precision == 0 {
                    format!("{}.", text)
                } else {
                    text
                }
            }
            'e' => exponent_form(v, precision, self.flags.alternate),
            _ => {
                let p = precision.max(1);
                let exponent = decimal_exponent(v, p - 1);
                let text = if exponent < -4 || exponent >= p as i32 {
                    exponent_form(v, p - 1, self.flags.alternate)
                } else {
                    let decimals = (p as i32 - 1 - exponent).max(0) as usize;
                    format!("{:.*}", decimals, v)
                };
                if self.flags.alternate {
                    text
                } else {
                    strip_trailing_zeros(&text)
                }
            }
        };
        if upper {
            body.to_ascii_uppercase()
        } else {
            body
        }
    }
}

impl std::fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn take_number(chars: &[char], i: &mut usize) -> Option<usize> {
    let start = *i;
    let mut n = 0usize;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        *i += 1;
    }
    (*i > start).then_some(n)
}

/// Sign and magnitude of an integral value
fn integer_parts(value: &Value) -> Option<(bool, u128)> {
    match value {
        Value::ULong64(v) => Some((false, *v as u128)),
        other => other
            .as_i64()
            .map(|v| (v < 0, (v as i128).unsigned_abs())),
    }
}

/// Two's complement bits of an integral value at its own width
fn unsigned_bits(value: &Value) -> Option<u64> {
    match *value {
        Value::Long64(v) => Some(v as u64),
        Value::ULong64(v) => Some(v),
        Value::Long(v) => Some(v as u32 as u64),
        Value::ULong(v) => Some(v as u64),
        Value::Short(v) => Some(v as u16 as u64),
        Value::UShort(v) => Some(v as u64),
        ref other => other.as_i64().map(|v| v as u64),
    }
}

fn split_radix_prefix(body: &str) -> (&str, &str) {
    for prefix in ["0x", "0X"] {
        if let Some(rest) = body.strip_prefix(prefix) {
            return (prefix, rest);
        }
    }
    ("", body)
}

/// Decimal exponent of `v` after rounding to `precision` fractional digits
/// in scientific form
fn decimal_exponent(v: f64, precision: usize) -> i32 {
    let text = format!("{:.*e}", precision, v);
    text.rsplit('e')
        .next()
        .and_then(|e| e.parse().ok())
        .unwrap_or(0)
}

/// C-style `%e` body: mantissa, `e`, sign and at least two exponent digits
fn exponent_form(v: f64, precision: usize, alternate: bool) -> String {
    let text = format!("{:.*e}", precision, v);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let dot = if alternate && precision == 0 { "." } else { "" };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{}e{}{:02}", mantissa, dot, sign, exponent.abs())
}

fn strip_trailing_zeros(text: &str) -> String {
    let (number, exponent) = match text.find('e') {
        Some(pos) => text.split_at(pos),
        None => (text, ""),
    };
    let number = if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    };
    format!("{}{}", number, exponent)
}
