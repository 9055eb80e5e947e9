//! Binary scalar encoding
//!
//! ## Value Layout
//! ```text
//! integers      native width two's complement
//! float/double  IEEE-754 binary32 / binary64
//! long double   x87 80-bit extended in a 16-byte slot (6 bytes padding)
//! string        [Len: i32][UTF-8 bytes]
//! character     1 byte
//! ```
//!
//! Writers always produce little-endian data; readers follow the byte order
//! announced in the header.

use std::io::{self, Read};

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};

use super::{DataType, Value};

/// Wire size of a long double slot
pub const LONG_DOUBLE_SIZE: usize = 16;

/// Upper bound on bytes reserved from a string length found in the stream
const MAX_STRING_PREALLOCATION: usize = 1 << 16;

/// Byte order of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the running platform
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Append one value to `buf`
pub fn encode_value(buf: &mut BytesMut, value: &Value, order: ByteOrder) -> Result<()> {
    let little = order == ByteOrder::Little;
    match value {
        Value::LongDouble(v) => {
            let raw = f64_to_x87(*v);
            if little {
                buf.put_slice(&raw);
            } else {
                let mut be = raw;
                be.reverse();
                buf.put_slice(&be);
            }
            buf.put_bytes(0, LONG_DOUBLE_SIZE - raw.len());
        }
        Value::Double(v) if little => buf.put_f64_le(*v),
        Value::Double(v) => buf.put_f64(*v),
        Value::Float(v) if little => buf.put_f32_le(*v),
        Value::Float(v) => buf.put_f32(*v),
        Value::Long64(v) if little => buf.put_i64_le(*v),
        Value::Long64(v) => buf.put_i64(*v),
        Value::ULong64(v) if little => buf.put_u64_le(*v),
        Value::ULong64(v) => buf.put_u64(*v),
        Value::Long(v) if little => buf.put_i32_le(*v),
        Value::Long(v) => buf.put_i32(*v),
        Value::ULong(v) if little => buf.put_u32_le(*v),
        Value::ULong(v) => buf.put_u32(*v),
        Value::Short(v) if little => buf.put_i16_le(*v),
        Value::Short(v) => buf.put_i16(*v),
        Value::UShort(v) if little => buf.put_u16_le(*v),
        Value::UShort(v) => buf.put_u16(*v),
        Value::String(s) => {
            let len = i32::try_from(s.len()).map_err(|_| {
                SddsError::Format(format!("String of {} bytes is too long", s.len()))
            })?;
            put_i32(buf, len, order);
            buf.put_slice(s.as_bytes());
        }
        Value::Character(c) => buf.put_u8(*c),
    }
    Ok(())
}

/// Append an `i32` in the given byte order (row counts, dimensions)
pub fn put_i32(buf: &mut BytesMut, v: i32, order: ByteOrder) {
    match order {
        ByteOrder::Little => buf.put_i32_le(v),
        ByteOrder::Big => buf.put_i32(v),
    }
}

/// Append an `i64` in the given byte order
pub fn put_i64(buf: &mut BytesMut, v: i64, order: ByteOrder) {
    match order {
        ByteOrder::Little => buf.put_i64_le(v),
        ByteOrder::Big => buf.put_i64(v),
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N]> {
    let mut raw = [0u8; N];
    reader.read_exact(&mut raw)?;
    Ok(raw)
}

/// Read an `i32` in the given byte order
pub fn read_i32<R: Read>(reader: &mut R, order: ByteOrder) -> Result<i32> {
    let raw = read_array::<4, _>(reader)?;
    Ok(match order {
        ByteOrder::Little => i32::from_le_bytes(raw),
        ByteOrder::Big => i32::from_be_bytes(raw),
    })
}

/// Read an `i64` in the given byte order
pub fn read_i64<R: Read>(reader: &mut R, order: ByteOrder) -> Result<i64> {
    let raw = read_array::<8, _>(reader)?;
    Ok(match order {
        ByteOrder::Little => i64::from_le_bytes(raw),
        ByteOrder::Big => i64::from_be_bytes(raw),
    })
}

macro_rules! read_scalar {
    ($reader:expr, $order:expr, $ty:ty, $n:literal) => {{
        let raw = read_array::<$n, _>($reader)?;
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(raw),
            ByteOrder::Big => <$ty>::from_be_bytes(raw),
        }
    }};
}

/// Read one value of the given kind
///
/// A stream that ends early surfaces as `SddsError::Io` with
/// `UnexpectedEof`, which callers use to tell torn pages from bad data.
pub fn decode_value<R: Read>(reader: &mut R, data_type: DataType, order: ByteOrder) -> Result<Value> {
    let value = match data_type {
        DataType::LongDouble => {
            let mut raw = read_array::<LONG_DOUBLE_SIZE, _>(reader)?;
            if order == ByteOrder::Big {
                raw.reverse();
            }
            let mut x87 = [0u8; 10];
            x87.copy_from_slice(&raw[..10]);
            Value::LongDouble(x87_to_f64(x87))
        }
        DataType::Double => Value::Double(read_scalar!(reader, order, f64, 8)),
        DataType::Float => Value::Float(read_scalar!(reader, order, f32, 4)),
        DataType::Long64 => Value::Long64(read_scalar!(reader, order, i64, 8)),
        DataType::ULong64 => Value::ULong64(read_scalar!(reader, order, u64, 8)),
        DataType::Long => Value::Long(read_scalar!(reader, order, i32, 4)),
        DataType::ULong => Value::ULong(read_scalar!(reader, order, u32, 4)),
        DataType::Short => Value::Short(read_scalar!(reader, order, i16, 2)),
        DataType::UShort => Value::UShort(read_scalar!(reader, order, u16, 2)),
        DataType::String => {
            let len = read_i32(reader, order)?;
            let len = usize::try_from(len)
                .map_err(|_| SddsError::Format(format!("Negative string length {}", len)))?;
            let mut bytes = Vec::with_capacity(len.min(MAX_STRING_PREALLOCATION));
            reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
            if bytes.len() < len {
                return Err(SddsError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("String of {} bytes cut short after {}", len, bytes.len()),
                )));
            }
            Value::String(String::from_utf8(bytes).map_err(|e| {
                SddsError::Format(format!("String value is not valid UTF-8: {}", e))
            })?)
        }
        DataType::Character => Value::Character(read_array::<1, _>(reader)?[0]),
    };
    Ok(value)
}

// =============================================================================
// x87 Extended Precision
// =============================================================================

/// Convert an `f64` to the 10-byte little-endian x87 extended layout
///
/// Layout: 64-bit mantissa with explicit integer bit, then sign and a 15-bit
/// exponent biased by 16383.
pub fn f64_to_x87(v: f64) -> [u8; 10] {
    let bits = v.to_bits();
    let sign = ((bits >> 63) as u16) << 15;
    let exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1u64 << 52) - 1);

    let (exponent, mantissa): (u16, u64) = if exp == 0 && frac == 0 {
        (0, 0)
    } else if exp == 0x7ff {
        let mantissa = if frac == 0 { 1 << 63 } else { (1 << 63) | (frac << 11) };
        (0x7fff, mantissa)
    } else if exp == 0 {
        // subnormal f64: normalize, the wider exponent range always fits
        let shift = frac.leading_zeros();
        ((15372 - shift as i32) as u16, frac << shift)
    } else {
        ((exp - 1023 + 16383) as u16, (1 << 63) | (frac << 11))
    };

    let mut out = [0u8; 10];
    out[..8].copy_from_slice(&mantissa.to_le_bytes());
    out[8..].copy_from_slice(&(sign | exponent).to_le_bytes());
    out
}

/// Convert the 10-byte little-endian x87 extended layout to the nearest `f64`
pub fn x87_to_f64(raw: [u8; 10]) -> f64 {
    let mut mantissa_bytes = [0u8; 8];
    mantissa_bytes.copy_from_slice(&raw[..8]);
    let mantissa = u64::from_le_bytes(mantissa_bytes);
    let sign_exp = u16::from_le_bytes([raw[8], raw[9]]);
    let negative = sign_exp & 0x8000 != 0;
    let exponent = (sign_exp & 0x7fff) as i32;

    let magnitude = if exponent == 0 && mantissa == 0 {
        0.0
    } else if exponent == 0x7fff {
        if mantissa << 1 == 0 {
            f64::INFINITY
        } else {
            f64::NAN
        }
    } else {
        scale_by_pow2(mantissa as f64, exponent - 16383 - 63)
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// `value * 2^exp` without intermediate overflow or underflow of the factor
fn scale_by_pow2(mut value: f64, mut exp: i32) -> f64 {
    while exp > 1000 {
        value *= 2f64.powi(1000);
        exp -= 1000;
        if value.is_infinite() {
            return value;
        }
    }
    while exp < -1000 {
        value *= 2f64.powi(-1000);
        exp += 1000;
        if value == 0.0 {
            return value;
        }
    }
    value * 2f64.powi(exp)
}
