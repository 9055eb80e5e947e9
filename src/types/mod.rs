//! Type System Module
//!
//! The fixed set of scalar kinds and their encode/decode rules for each
//! physical mode.
//!
//! ## Type Codes
//! ```text
//! ┌──────┬──────────────────┬─────────────┬──────────────┬───────────┐
//! │ Code │ Long name        │ Alias       │ Wire name    │ Binary    │
//! ├──────┼──────────────────┼─────────────┼──────────────┼───────────┤
//! │  1   │ SDDS_LONGDOUBLE  │             │ longdouble   │ 16 bytes  │
//! │  2   │ SDDS_DOUBLE      │ SDDS_REAL64 │ double       │ f64       │
//! │  3   │ SDDS_FLOAT       │ SDDS_REAL32 │ float        │ f32       │
//! │  4   │ SDDS_LONG64      │ SDDS_INT64  │ long64       │ i64       │
//! │  5   │ SDDS_ULONG64     │ SDDS_UINT64 │ ulong64      │ u64       │
//! │  6   │ SDDS_LONG        │ SDDS_INT32  │ long         │ i32       │
//! │  7   │ SDDS_ULONG       │ SDDS_UINT32 │ ulong        │ u32       │
//! │  8   │ SDDS_SHORT       │ SDDS_INT16  │ short        │ i16       │
//! │  9   │ SDDS_USHORT      │ SDDS_UINT16 │ ushort       │ u16       │
//! │ 10   │ SDDS_STRING      │             │ string       │ i32 + utf8│
//! │ 11   │ SDDS_CHARACTER   │             │ character    │ 1 byte    │
//! └──────┴──────────────────┴─────────────┴──────────────┴───────────┘
//! ```

pub mod ascii;
pub mod binary;
pub mod format;
mod value;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};

pub use binary::ByteOrder;
pub use format::FormatSpec;
pub use value::Value;

/// Name reported for type codes outside the known set
pub const UNKNOWN_TYPE_NAME: &str = "Unknown Data Type";

/// Number of scalar kinds
pub const NUM_TYPES: i32 = 11;

// =============================================================================
// Data Type
// =============================================================================

/// Scalar data kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DataType {
    LongDouble = 1,
    Double = 2,
    Float = 3,
    Long64 = 4,
    ULong64 = 5,
    Long = 6,
    ULong = 7,
    Short = 8,
    UShort = 9,
    String = 10,
    Character = 11,
}

/// Every spelling accepted for a type, long and short forms
const ALIASES: &[(&str, DataType)] = &[
    ("SDDS_LONGDOUBLE", DataType::LongDouble),
    ("SDDS_DOUBLE", DataType::Double),
    ("SDDS_REAL64", DataType::Double),
    ("SDDS_FLOAT", DataType::Float),
    ("SDDS_REAL32", DataType::Float),
    ("SDDS_LONG64", DataType::Long64),
    ("SDDS_INT64", DataType::Long64),
    ("SDDS_ULONG64", DataType::ULong64),
    ("SDDS_UINT64", DataType::ULong64),
    ("SDDS_LONG", DataType::Long),
    ("SDDS_INT32", DataType::Long),
    ("SDDS_ULONG", DataType::ULong),
    ("SDDS_UINT32", DataType::ULong),
    ("SDDS_SHORT", DataType::Short),
    ("SDDS_INT16", DataType::Short),
    ("SDDS_USHORT", DataType::UShort),
    ("SDDS_UINT16", DataType::UShort),
    ("SDDS_STRING", DataType::String),
    ("SDDS_CHARACTER", DataType::Character),
    ("longdouble", DataType::LongDouble),
    ("double", DataType::Double),
    ("real64", DataType::Double),
    ("float", DataType::Float),
    ("real32", DataType::Float),
    ("long64", DataType::Long64),
    ("int64", DataType::Long64),
    ("ulong64", DataType::ULong64),
    ("uint64", DataType::ULong64),
    ("long", DataType::Long),
    ("int32", DataType::Long),
    ("ulong", DataType::ULong),
    ("uint32", DataType::ULong),
    ("short", DataType::Short),
    ("int16", DataType::Short),
    ("ushort", DataType::UShort),
    ("uint16", DataType::UShort),
    ("string", DataType::String),
    ("character", DataType::Character),
];

impl DataType {
    pub const REAL64: DataType = DataType::Double;
    pub const REAL32: DataType = DataType::Float;
    pub const INT64: DataType = DataType::Long64;
    pub const UINT64: DataType = DataType::ULong64;
    pub const INT32: DataType = DataType::Long;
    pub const UINT32: DataType = DataType::ULong;
    pub const INT16: DataType = DataType::Short;
    pub const UINT16: DataType = DataType::UShort;

    /// All kinds in code order
    pub const ALL: [DataType; 11] = [
        DataType::LongDouble,
        DataType::Double,
        DataType::Float,
        DataType::Long64,
        DataType::ULong64,
        DataType::Long,
        DataType::ULong,
        DataType::Short,
        DataType::UShort,
        DataType::String,
        DataType::Character,
    ];

    /// Numeric type code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a kind by numeric code
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Canonical long name, e.g. `SDDS_DOUBLE`
    pub fn name(self) -> &'static str {
        match self {
            DataType::LongDouble => "SDDS_LONGDOUBLE",
            DataType::Double => "SDDS_DOUBLE",
            DataType::Float => "SDDS_FLOAT",
            DataType::Long64 => "SDDS_LONG64",
            DataType::ULong64 => "SDDS_ULONG64",
            DataType::Long => "SDDS_LONG",
            DataType::ULong => "SDDS_ULONG",
            DataType::Short => "SDDS_SHORT",
            DataType::UShort => "SDDS_USHORT",
            DataType::String => "SDDS_STRING",
            DataType::Character => "SDDS_CHARACTER",
        }
    }

    /// Short name as written in headers, e.g. `double`
    pub fn short_name(self) -> &'static str {
        match self {
            DataType::LongDouble => "longdouble",
            DataType::Double => "double",
            DataType::Float => "float",
            DataType::Long64 => "long64",
            DataType::ULong64 => "ulong64",
            DataType::Long => "long",
            DataType::ULong => "ulong",
            DataType::Short => "short",
            DataType::UShort => "ushort",
            DataType::String => "string",
            DataType::Character => "character",
        }
    }

    /// Look up a kind by any of its long or short spellings
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, t)| *t)
    }

    /// Size on the binary wire; `None` for strings
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            DataType::LongDouble => Some(binary::LONG_DOUBLE_SIZE),
            DataType::Double | DataType::Long64 | DataType::ULong64 => Some(8),
            DataType::Float | DataType::Long | DataType::ULong => Some(4),
            DataType::Short | DataType::UShort => Some(2),
            DataType::Character => Some(1),
            DataType::String => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::Long64
                | DataType::ULong64
                | DataType::Long
                | DataType::ULong
                | DataType::Short
                | DataType::UShort
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::LongDouble | DataType::Double | DataType::Float)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

// =============================================================================
// Code <-> Name Helpers (total: unknown codes map to a sentinel)
// =============================================================================

/// Long name for a numeric code, or [`UNKNOWN_TYPE_NAME`]
pub fn type_name(code: i32) -> &'static str {
    DataType::from_code(code)
        .map(DataType::name)
        .unwrap_or(UNKNOWN_TYPE_NAME)
}

/// Short name for a numeric code, or [`UNKNOWN_TYPE_NAME`]
pub fn short_type_name(code: i32) -> &'static str {
    DataType::from_code(code)
        .map(DataType::short_name)
        .unwrap_or(UNKNOWN_TYPE_NAME)
}

/// Numeric code for a type name, `0` when the name is unknown
pub fn identify_type(name: &str) -> i32 {
    DataType::from_name(name).map(DataType::code).unwrap_or(0)
}

/// Binary size of a fixed-width kind, `-1` for strings and unknown codes
pub fn type_size(code: i32) -> i32 {
    DataType::from_code(code)
        .and_then(DataType::fixed_size)
        .map(|size| size as i32)
        .unwrap_or(-1)
}

// =============================================================================
// Data Mode
// =============================================================================

/// Physical encoding of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DataMode {
    Binary = 1,
    Ascii = 2,
}

impl DataMode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(DataMode::Binary),
            2 => Some(DataMode::Ascii),
            _ => None,
        }
    }

    /// Name used in the `&data` header namelist
    pub fn name(self) -> &'static str {
        match self {
            DataMode::Binary => "binary",
            DataMode::Ascii => "ascii",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "binary" => Some(DataMode::Binary),
            "ascii" => Some(DataMode::Ascii),
            _ => None,
        }
    }
}

// =============================================================================
// Single-value encode / decode
// =============================================================================

/// Encode one value of the given type in the given mode
///
/// The value is coerced to `data_type` first. ASCII output is the token as it
/// appears in a data section (quoted when needed); binary output is
/// little-endian.
pub fn encode(value: &Value, data_type: DataType, mode: DataMode) -> Result<Vec<u8>> {
    let value = value.clone().coerce(data_type)?;
    match mode {
        DataMode::Ascii => Ok(ascii::encode_token(&value, None).into_bytes()),
        DataMode::Binary => {
            let mut buf = BytesMut::new();
            binary::encode_value(&mut buf, &value, ByteOrder::Little)?;
            Ok(buf.to_vec())
        }
    }
}

/// Decode one value of the given type from its mode-specific representation
pub fn decode(bytes: &[u8], data_type: DataType, mode: DataMode) -> Result<Value> {
    match mode {
        DataMode::Ascii => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| SddsError::Format(format!("Token is not valid UTF-8: {}", e)))?;
            let token = ascii::unquote(text.trim())?;
            ascii::decode_token(&token, data_type)
        }
        DataMode::Binary => {
            let mut cursor = bytes;
            let value = binary::decode_value(&mut cursor, data_type, ByteOrder::Little)
                .map_err(|e| match e {
                    SddsError::Io(io) => SddsError::Format(format!(
                        "Truncated {} value: {}",
                        data_type.short_name(),
                        io
                    )),
                    other => other,
                })?;
            if !cursor.is_empty() {
                return Err(SddsError::Format(format!(
                    "{} trailing bytes after {} value",
                    cursor.len(),
                    data_type.short_name()
                )));
            }
            Ok(value)
        }
    }
}
