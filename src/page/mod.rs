//! Page Store Module
//!
//! In-memory representation of pages.
//!
//! ## Page Shape
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Page                                        │
//! │  parameters: [Value; P]                     │  one scalar per parameter
//! │  arrays:     [ArrayValue; A]                │  dims + flattened data
//! │  columns:    [ValueBuffer; C]               │  all of equal length
//! └─────────────────────────────────────────────┘
//! ```
//!
//! [`PageStore`] keeps a whole multi-page dataset in memory with 1-based
//! page/row accessors.

mod buffer;
mod store;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};
use crate::layout::Layout;
use crate::types::Value;

pub use buffer::ValueBuffer;
pub use store::PageStore;

/// Upper bound on rows reserved up front from a caller's hint
const MAX_ROW_RESERVATION: usize = 1 << 16;

/// Number of elements described by a dimension vector
///
/// Fails with `Format` when the product does not fit in `usize`.
pub fn element_count(dimensions: &[usize]) -> Result<usize> {
    dimensions
        .iter()
        .try_fold(1usize, |count, dim| count.checked_mul(*dim))
        .ok_or_else(|| {
            SddsError::Format(format!("Array dimensions {:?} are too large", dimensions))
        })
}

// =============================================================================
// Array Value
// =============================================================================

/// One array on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub dimensions: Vec<usize>,
    pub data: ValueBuffer,
}

impl ArrayValue {
    /// Pair data with dimensions; the element count must match
    pub fn new(dimensions: Vec<usize>, data: ValueBuffer) -> Result<Self> {
        let expected = element_count(&dimensions)?;
        if expected != data.len() {
            return Err(SddsError::InconsistentPage(format!(
                "Array dimensions {:?} need {} elements, got {}",
                dimensions,
                expected,
                data.len()
            )));
        }
        Ok(Self { dimensions, data })
    }

    /// One-dimensional array holding `data`
    pub fn vector(data: ValueBuffer) -> Self {
        Self {
            dimensions: vec![data.len()],
            data,
        }
    }
}

// =============================================================================
// Page
// =============================================================================

/// Values of one page, in layout order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub parameters: Vec<Value>,
    pub arrays: Vec<ArrayValue>,
    pub columns: Vec<ValueBuffer>,
}

impl Page {
    /// Zero-initialised page; fixed-value parameters take their fixed value
    pub fn new(layout: &Layout) -> Self {
        Self::with_row_capacity(layout, 0)
    }

    /// Empty page with room reserved for `rows` rows; the hint is capped
    pub fn with_row_capacity(layout: &Layout, rows: usize) -> Self {
        let parameters = layout
            .parameters()
            .iter()
            .map(|d| {
                d.fixed()
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| Value::default_for(d.data_type))
            })
            .collect();
        let arrays = layout
            .arrays()
            .iter()
            .map(|d| ArrayValue {
                dimensions: vec![0; d.dimensions as usize],
                data: ValueBuffer::new(d.data_type),
            })
            .collect();
        let columns = layout
            .columns()
            .iter()
            .map(|d| ValueBuffer::with_capacity(d.data_type, rows.min(MAX_ROW_RESERVATION)))
            .collect();
        Self {
            parameters,
            arrays,
            columns,
        }
    }

    /// Common length of all columns; zero when there are none
    pub fn row_count(&self) -> Result<usize> {
        let mut lengths = self.columns.iter().map(ValueBuffer::len);
        let first = match lengths.next() {
            Some(len) => len,
            None => return Ok(0),
        };
        if let Some(other) = lengths.find(|len| *len != first) {
            return Err(SddsError::InconsistentPage(format!(
                "Column lengths differ ({} vs {})",
                first, other
            )));
        }
        Ok(first)
    }

    /// Check this page against a layout: counts, kinds, array shapes, row counts
    pub fn validate(&self, layout: &Layout) -> Result<()> {
        if self.parameters.len() != layout.parameter_count()
            || self.arrays.len() != layout.array_count()
            || self.columns.len() != layout.column_count()
        {
            return Err(SddsError::InconsistentPage(format!(
                "Page holds {}/{}/{} parameters/arrays/columns, layout defines {}/{}/{}",
                self.parameters.len(),
                self.arrays.len(),
                self.columns.len(),
                layout.parameter_count(),
                layout.array_count(),
                layout.column_count()
            )));
        }

        for (value, def) in self.parameters.iter().zip(layout.parameters()) {
            if value.data_type() != def.data_type {
                return Err(SddsError::InconsistentPage(format!(
                    "Parameter {} holds {} but is defined as {}",
                    def.name,
                    value.data_type(),
                    def.data_type
                )));
            }
        }

        for (array, def) in self.arrays.iter().zip(layout.arrays()) {
            if array.dimensions.len() != def.dimensions as usize {
                return Err(SddsError::InconsistentPage(format!(
                    "Array {} has {} dimensions, defined with {}",
                    def.name,
                    array.dimensions.len(),
                    def.dimensions
                )));
            }
            if array.data.data_type() != def.data_type {
                return Err(SddsError::InconsistentPage(format!(
                    "Array {} holds {} but is defined as {}",
                    def.name,
                    array.data.data_type(),
                    def.data_type
                )));
            }
            let expected = element_count(&array.dimensions)?;
            if expected != array.data.len() {
                return Err(SddsError::InconsistentPage(format!(
                    "Array {} dimensions {:?} need {} elements, got {}",
                    def.name,
                    array.dimensions,
                    expected,
                    array.data.len()
                )));
            }
        }

        for (column, def) in self.columns.iter().zip(layout.columns()) {
            if column.data_type() != def.data_type {
                return Err(SddsError::InconsistentPage(format!(
                    "Column {} holds {} but is defined as {}",
                    def.name,
                    column.data_type(),
                    def.data_type
                )));
            }
        }

        self.row_count().map(|_| ())
    }

    /// Keep only the last `n` rows of every column
    pub fn keep_last_rows(&mut self, n: usize) {
        for column in &mut self.columns {
            column.keep_last(n);
        }
    }

    /// Drop every row
    pub fn clear_rows(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
    }
}
