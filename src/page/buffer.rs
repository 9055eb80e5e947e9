//! Typed value buffers
//!
//! A column block (or array payload) stored as one native vector per kind, so
//! a page of a million doubles is a `Vec<f64>` and not a million `Value`s.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};
use crate::types::{DataType, Value};

/// A homogeneous vector of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueBuffer {
    LongDouble(Vec<f64>),
    Double(Vec<f64>),
    Float(Vec<f32>),
    Long64(Vec<i64>),
    ULong64(Vec<u64>),
    Long(Vec<i32>),
    ULong(Vec<u32>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    String(Vec<String>),
    Character(Vec<u8>),
}

/// Run `$body` with `$v` bound to the inner vector, whatever the variant
macro_rules! with_vec {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            ValueBuffer::LongDouble($v) => $body,
            ValueBuffer::Double($v) => $body,
            ValueBuffer::Float($v) => $body,
            ValueBuffer::Long64($v) => $body,
            ValueBuffer::ULong64($v) => $body,
            ValueBuffer::Long($v) => $body,
            ValueBuffer::ULong($v) => $body,
            ValueBuffer::Short($v) => $body,
            ValueBuffer::UShort($v) => $body,
            ValueBuffer::String($v) => $body,
            ValueBuffer::Character($v) => $body,
        }
    };
}

impl ValueBuffer {
    /// Empty buffer of a kind
    pub fn new(data_type: DataType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    pub fn with_capacity(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::LongDouble => ValueBuffer::LongDouble(Vec::with_capacity(capacity)),
            DataType::Double => ValueBuffer::Double(Vec::with_capacity(capacity)),
            DataType::Float => ValueBuffer::Float(Vec::with_capacity(capacity)),
            DataType::Long64 => ValueBuffer::Long64(Vec::with_capacity(capacity)),
            DataType::ULong64 => ValueBuffer::ULong64(Vec::with_capacity(capacity)),
            DataType::Long => ValueBuffer::Long(Vec::with_capacity(capacity)),
            DataType::ULong => ValueBuffer::ULong(Vec::with_capacity(capacity)),
            DataType::Short => ValueBuffer::Short(Vec::with_capacity(capacity)),
            DataType::UShort => ValueBuffer::UShort(Vec::with_capacity(capacity)),
            DataType::String => ValueBuffer::String(Vec::with_capacity(capacity)),
            DataType::Character => ValueBuffer::Character(Vec::with_capacity(capacity)),
        }
    }

    /// Build from loose values, coercing each to `data_type`
    pub fn from_values(data_type: DataType, values: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut buffer = Self::new(data_type);
        for value in values {
            buffer.push(value)?;
        }
        Ok(buffer)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ValueBuffer::LongDouble(_) => DataType::LongDouble,
            ValueBuffer::Double(_) => DataType::Double,
            ValueBuffer::Float(_) => DataType::Float,
            ValueBuffer::Long64(_) => DataType::Long64,
            ValueBuffer::ULong64(_) => DataType::ULong64,
            ValueBuffer::Long(_) => DataType::Long,
            ValueBuffer::ULong(_) => DataType::ULong,
            ValueBuffer::Short(_) => DataType::Short,
            ValueBuffer::UShort(_) => DataType::UShort,
            ValueBuffer::String(_) => DataType::String,
            ValueBuffer::Character(_) => DataType::Character,
        }
    }

    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`, if in range
    pub fn get(&self, index: usize) -> Option<Value> {
        let value = match self {
            ValueBuffer::LongDouble(v) => Value::LongDouble(*v.get(index)?),
            ValueBuffer::Double(v) => Value::Double(*v.get(index)?),
            ValueBuffer::Float(v) => Value::Float(*v.get(index)?),
            ValueBuffer::Long64(v) => Value::Long64(*v.get(index)?),
            ValueBuffer::ULong64(v) => Value::ULong64(*v.get(index)?),
            ValueBuffer::Long(v) => Value::Long(*v.get(index)?),
            ValueBuffer::ULong(v) => Value::ULong(*v.get(index)?),
            ValueBuffer::Short(v) => Value::Short(*v.get(index)?),
            ValueBuffer::UShort(v) => Value::UShort(*v.get(index)?),
            ValueBuffer::String(v) => Value::String(v.get(index)?.clone()),
            ValueBuffer::Character(v) => Value::Character(*v.get(index)?),
        };
        Some(value)
    }

    /// Overwrite the value at `index`; fails with `InvalidRow` when out of range
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        if index >= self.len() {
            return Err(SddsError::InvalidRow(index));
        }
        let value = value.coerce(self.data_type())?;
        match (self, value) {
            (ValueBuffer::LongDouble(v), Value::LongDouble(x)) => v[index] = x,
            (ValueBuffer::Double(v), Value::Double(x)) => v[index] = x,
            (ValueBuffer::Float(v), Value::Float(x)) => v[index] = x,
            (ValueBuffer::Long64(v), Value::Long64(x)) => v[index] = x,
            (ValueBuffer::ULong64(v), Value::ULong64(x)) => v[index] = x,
            (ValueBuffer::Long(v), Value::Long(x)) => v[index] = x,
            (ValueBuffer::ULong(v), Value::ULong(x)) => v[index] = x,
            (ValueBuffer::Short(v), Value::Short(x)) => v[index] = x,
            (ValueBuffer::UShort(v), Value::UShort(x)) => v[index] = x,
            (ValueBuffer::String(v), Value::String(x)) => v[index] = x,
            (ValueBuffer::Character(v), Value::Character(x)) => v[index] = x,
            _ => unreachable!("value coerced to buffer type"),
        }
        Ok(())
    }

    /// Append a value, coercing it to the buffer type
    pub fn push(&mut self, value: Value) -> Result<()> {
        let value = value.coerce(self.data_type())?;
        match (self, value) {
            (ValueBuffer::LongDouble(v), Value::LongDouble(x)) => v.push(x),
            (ValueBuffer::Double(v), Value::Double(x)) => v.push(x),
            (ValueBuffer::Float(v), Value::Float(x)) => v.push(x),
            (ValueBuffer::Long64(v), Value::Long64(x)) => v.push(x),
            (ValueBuffer::ULong64(v), Value::ULong64(x)) => v.push(x),
            (ValueBuffer::Long(v), Value::Long(x)) => v.push(x),
            (ValueBuffer::ULong(v), Value::ULong(x)) => v.push(x),
            (ValueBuffer::Short(v), Value::Short(x)) => v.push(x),
            (ValueBuffer::UShort(v), Value::UShort(x)) => v.push(x),
            (ValueBuffer::String(v), Value::String(x)) => v.push(x),
            (ValueBuffer::Character(v), Value::Character(x)) => v.push(x),
            _ => unreachable!("value coerced to buffer type"),
        }
        Ok(())
    }

    /// Grow (with zero values) or shrink to `len`
    pub fn resize(&mut self, len: usize) {
        with_vec!(self, v => v.resize_with(len, Default::default))
    }

    pub fn truncate(&mut self, len: usize) {
        with_vec!(self, v => v.truncate(len))
    }

    /// Drop everything but the last `n` values
    pub fn keep_last(&mut self, n: usize) {
        with_vec!(self, v => {
            let excess = v.len().saturating_sub(n);
            v.drain(..excess);
        })
    }

    pub fn clear(&mut self) {
        with_vec!(self, v => v.clear())
    }

    pub fn reserve(&mut self, additional: usize) {
        with_vec!(self, v => v.reserve(additional))
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.iter().collect()
    }

    /// Copy of this buffer with every value coerced to `data_type`
    pub fn convert(&self, data_type: DataType) -> Result<Self> {
        if self.data_type() == data_type {
            return Ok(self.clone());
        }
        Self::from_values(data_type, self.iter())
    }
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ValueBuffer {
                fn from(v: Vec<$ty>) -> Self {
                    ValueBuffer::$variant(v)
                }
            }
        )*
    };
}

impl_from_vec! {
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

impl From<Vec<&str>> for ValueBuffer {
    fn from(v: Vec<&str>) -> Self {
        ValueBuffer::String(v.into_iter().map(str::to_string).collect())
    }
}
