//! Binary page encoding
//!
//! ## Page Layout
//! ```text
//! ┌────────────────┬────────────────────┬──────────────────────────┬──────────┐
//! │ Row count: i32 │ Parameters         │ Arrays                   │ Columns  │
//! │ (i32::MIN then │ (non-fixed, in     │ [dims: i32 × d][elements]│ row- or  │
//! │  i64 if large) │  definition order) │ per array                │ column-  │
//! │                │                    │                          │ major    │
//! └────────────────┴────────────────────┴──────────────────────────┴──────────┘
//! ```

use std::io::BufRead;
use std::ops::Range;

use bytes::BytesMut;
use tracing::warn;

use crate::error::{Result, SddsError};
use crate::layout::Layout;
use crate::page::{element_count, ArrayValue, Page, ValueBuffer};
use crate::types::binary::{decode_value, encode_value, put_i32, put_i64, read_i32, read_i64};
use crate::types::{ByteOrder, Value};

use super::source::{is_eof, Source};
use super::{PageExtent, RowCount};

/// Marker announcing a 64-bit row count
const ROW_COUNT_ESCAPE: i32 = i32::MIN;

/// Upper bound on capacity reserved from counts found in the stream
const MAX_PREALLOCATION: usize = 1 << 16;

// =============================================================================
// Writing
// =============================================================================

/// Append the row count, parameters and arrays of a page
pub(crate) fn encode_preamble(
    buf: &mut BytesMut,
    layout: &Layout,
    page: &Page,
    row_count: RowCount,
    order: ByteOrder,
) -> Result<()> {
    match row_count {
        RowCount::Final(rows) => match i32::try_from(rows) {
            Ok(rows) => put_i32(buf, rows, order),
            Err(_) => {
                put_i32(buf, ROW_COUNT_ESCAPE, order);
                put_i64(buf, rows as i64, order);
            }
        },
        RowCount::Updatable(rows) => put_i32(buf, updatable_row_count(rows)?, order),
    }

    for (value, def) in page.parameters.iter().zip(layout.parameters()) {
        if def.fixed_value.is_none() {
            encode_value(buf, value, order)?;
        }
    }

    for array in &page.arrays {
        for dim in &array.dimensions {
            let dim = i32::try_from(*dim).map_err(|_| {
                SddsError::Format(format!("Array dimension {} does not fit in 32 bits", dim))
            })?;
            put_i32(buf, dim, order);
        }
        for value in array.data.iter() {
            encode_value(buf, &value, order)?;
        }
    }
    Ok(())
}

/// Row count that fits the in-place rewritable field
pub(crate) fn updatable_row_count(rows: usize) -> Result<i32> {
    i32::try_from(rows).map_err(|_| {
        SddsError::Format(format!("Row count {} is too large for an updatable page", rows))
    })
}

/// Append `rows`, row by row
pub(crate) fn encode_rows(buf: &mut BytesMut, page: &Page, rows: Range<usize>, order: ByteOrder) -> Result<()> {
    for row in rows {
        for column in &page.columns {
            if let Some(value) = column.get(row) {
                encode_value(buf, &value, order)?;
            }
        }
    }
    Ok(())
}

/// Append every row, column by column
pub(crate) fn encode_columns(buf: &mut BytesMut, page: &Page, order: ByteOrder) -> Result<()> {
    for column in &page.columns {
        for value in column.iter() {
            encode_value(buf, &value, order)?;
        }
    }
    Ok(())
}

// =============================================================================
// Reading
// =============================================================================

pub(crate) struct DecodedPage {
    pub page: Page,
    pub extent: PageExtent,
    /// Rows were cut short at end of input and the complete ones kept
    pub recovered: bool,
}

/// Read one page; `None` at a clean end of input
pub(crate) fn decode_page<R: BufRead>(
    src: &mut Source<R>,
    layout: &Layout,
    fixed: &[Option<Value>],
    order: ByteOrder,
    column_major: bool,
    auto_recover: bool,
) -> Result<Option<DecodedPage>> {
    let start = src.position();
    if src.at_eof()? {
        return Ok(None);
    }

    let count = read_i32(src, order)?;
    let (rows, escaped) = if count == ROW_COUNT_ESCAPE {
        (read_i64(src, order)?, true)
    } else {
        (count as i64, false)
    };
    let rows = usize::try_from(rows)
        .map_err(|_| SddsError::Format(format!("Negative row count {}", rows)))?;

    let mut parameters = Vec::with_capacity(layout.parameter_count());
    for (i, def) in layout.parameters().iter().enumerate() {
        match &fixed[i] {
            Some(value) => parameters.push(value.clone()),
            None => parameters.push(decode_value(src, def.data_type, order)?),
        }
    }

    let mut arrays = Vec::with_capacity(layout.array_count());
    for def in layout.arrays() {
        let mut dimensions = Vec::with_capacity(def.dimensions as usize);
        for _ in 0..def.dimensions {
            let dim = read_i32(src, order)?;
            let dim = usize::try_from(dim).map_err(|_| {
                SddsError::Format(format!("Negative dimension {} for array {}", dim, def.name))
            })?;
            dimensions.push(dim);
        }
        let count = element_count(&dimensions)?;
        let mut data = ValueBuffer::with_capacity(def.data_type, count.min(MAX_PREALLOCATION));
        for _ in 0..count {
            data.push(decode_value(src, def.data_type, order)?)?;
        }
        arrays.push(ArrayValue::new(dimensions, data)?);
    }

    let mut columns: Vec<ValueBuffer> = layout
        .columns()
        .iter()
        .map(|d| ValueBuffer::with_capacity(d.data_type, rows.min(MAX_PREALLOCATION)))
        .collect();
    let mut recovered = false;

    if !columns.is_empty() {
        if column_major {
            for (column, def) in columns.iter_mut().zip(layout.columns()) {
                for _ in 0..rows {
                    column.push(decode_value(src, def.data_type, order)?)?;
                }
            }
        } else {
            'rows: for row in 0..rows {
                for (column, def) in columns.iter_mut().zip(layout.columns()) {
                    match decode_value(src, def.data_type, order) {
                        Ok(value) => column.push(value)?,
                        Err(e) if auto_recover && is_eof(&e) => {
                            warn!(row, expected = rows, "Binary page truncated, keeping complete rows");
                            recovered = true;
                            break 'rows;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            if recovered {
                let complete = columns.iter().map(ValueBuffer::len).min().unwrap_or(0);
                for column in &mut columns {
                    column.truncate(complete);
                }
            }
        }
    }

    let page = Page {
        parameters,
        arrays,
        columns,
    };
    let rows = page.row_count()?;
    Ok(Some(DecodedPage {
        page,
        extent: PageExtent {
            start,
            end: src.position(),
            rows,
            escaped,
        },
        recovered,
    }))
}
