//! Scalar values
//!
//! A tagged scalar, one variant per [`DataType`], plus the coercion rules
//! used when callers bind values of a different kind.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};

use super::{ascii, DataType};

/// A single scalar of one of the fixed kinds
///
/// Long doubles are held as `f64` in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    LongDouble(f64),
    Double(f64),
    Float(f32),
    Long64(i64),
    ULong64(u64),
    Long(i32),
    ULong(u32),
    Short(i16),
    UShort(u16),
    String(String),
    Character(u8),
}

/// Numeric view used during coercion
enum Number {
    Int(i128),
    Float(f64),
}

impl Value {
    /// The kind of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::LongDouble(_) => DataType::LongDouble,
            Value::Double(_) => DataType::Double,
            Value::Float(_) => DataType::Float,
            Value::Long64(_) => DataType::Long64,
            Value::ULong64(_) => DataType::ULong64,
            Value::Long(_) => DataType::Long,
            Value::ULong(_) => DataType::ULong,
            Value::Short(_) => DataType::Short,
            Value::UShort(_) => DataType::UShort,
            Value::String(_) => DataType::String,
            Value::Character(_) => DataType::Character,
        }
    }

    /// Zero (or empty) value of a kind
    pub fn default_for(data_type: DataType) -> Value {
        match data_type {
            DataType::LongDouble => Value::LongDouble(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::Float => Value::Float(0.0),
            DataType::Long64 => Value::Long64(0),
            DataType::ULong64 => Value::ULong64(0),
            DataType::Long => Value::Long(0),
            DataType::ULong => Value::ULong(0),
            DataType::Short => Value::Short(0),
            DataType::UShort => Value::UShort(0),
            DataType::String => Value::String(String::new()),
            DataType::Character => Value::Character(0),
        }
    }

    /// Build a character value from a `char` in the single-byte range
    pub fn character(c: char) -> Result<Value> {
        u8::try_from(u32::from(c))
            .map(Value::Character)
            .map_err(|_| SddsError::TypeMismatch {
                value: c.to_string(),
                target: DataType::Character.name(),
            })
    }

    /// Numeric content as `f64`, if this is a numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self.number()? {
            Number::Int(i) => Some(i as f64),
            Number::Float(f) => Some(f),
        }
    }

    /// Integer content, if this is an integer value (or an integral float)
    pub fn as_i64(&self) -> Option<i64> {
        match self.number()? {
            Number::Int(i) => i64::try_from(i).ok(),
            Number::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
            Number::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn number(&self) -> Option<Number> {
        match *self {
            Value::LongDouble(v) | Value::Double(v) => Some(Number::Float(v)),
            Value::Float(v) => Some(Number::Float(v as f64)),
            Value::Long64(v) => Some(Number::Int(v as i128)),
            Value::ULong64(v) => Some(Number::Int(v as i128)),
            Value::Long(v) => Some(Number::Int(v as i128)),
            Value::ULong(v) => Some(Number::Int(v as i128)),
            Value::Short(v) => Some(Number::Int(v as i128)),
            Value::UShort(v) => Some(Number::Int(v as i128)),
            Value::String(_) | Value::Character(_) => None,
        }
    }

    /// Convert to another kind
    ///
    /// Integers convert between widths when the value fits, integers widen to
    /// floats, floats narrow to integers only when integral and in range,
    /// strings parse as the target kind and numbers print as strings, and a
    /// one-byte string converts to a character.
    pub fn coerce(self, target: DataType) -> Result<Value> {
        if self.data_type() == target {
            return Ok(self);
        }

        let mismatch = |value: &Value| SddsError::TypeMismatch {
            value: format!("{:?}", value),
            target: target.name(),
        };

        match (&self, target) {
            (Value::String(s), _) if target != DataType::Character => {
                ascii::decode_token(s.trim(), target).map_err(|_| mismatch(&self))
            }
            (Value::String(s), DataType::Character) => match s.as_bytes() {
                [b] => Ok(Value::Character(*b)),
                _ => Err(mismatch(&self)),
            },
            (Value::Character(c), DataType::String) => Ok(Value::String((*c as char).to_string())),
            (Value::Character(_), _) => Err(mismatch(&self)),
            (_, DataType::String) => Ok(Value::String(ascii::encode_plain(&self))),
            (_, DataType::Character) => Err(mismatch(&self)),
            _ => {
                let number = self.number().ok_or_else(|| mismatch(&self))?;
                convert_number(number, target).ok_or_else(|| mismatch(&self))
            }
        }
    }
}

fn convert_number(number: Number, target: DataType) -> Option<Value> {
    if target.is_float() {
        let f = match number {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        };
        return Some(match target {
            DataType::LongDouble => Value::LongDouble(f),
            DataType::Double => Value::Double(f),
            _ => Value::Float(f as f32),
        });
    }

    let int = match number {
        Number::Int(i) => i,
        Number::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.8e19 => f as i128,
        Number::Float(_) => return None,
    };

    match target {
        DataType::Long64 => i64::try_from(int).ok().map(Value::Long64),
        DataType::ULong64 => u64::try_from(int).ok().map(Value::ULong64),
        DataType::Long => i32::try_from(int).ok().map(Value::Long),
        DataType::ULong => u32::try_from(int).ok().map(Value::ULong),
        DataType::Short => i16::try_from(int).ok().map(Value::Short),
        DataType::UShort => u16::try_from(int).ok().map(Value::UShort),
        _ => None,
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&ascii::encode_plain(self))
    }
}

// =============================================================================
// Conversions from Rust scalars
// =============================================================================

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    f64 => Double,
    f32 => Float,
    i64 => Long64,
    u64 => ULong64,
    i32 => Long,
    u32 => ULong,
    i16 => Short,
    u16 => UShort,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
