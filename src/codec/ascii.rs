//! ASCII page encoding
//!
//! ## Page Layout
//! ```text
//! ! page number 3
//! <value>                      one line per non-fixed parameter
//! <d1> <d2> ...                per array: dimensions
//! <e1> <e2> ... <e10>            then elements, wrapped
//! <row count>                  right-aligned in 20 chars when updatable
//! <c1> <c2> ... <cN>           one line per row
//! ```
//!
//! Blank lines and lines starting with `!` are ignored when reading. String
//! parameters take their whole line, so they need no quoting unless they
//! would be mistaken for a comment or blank line.

use std::io::BufRead;
use std::ops::Range;

use crate::error::{Result, SddsError};
use crate::layout::Layout;
use crate::page::{element_count, ArrayValue, Page, ValueBuffer};
use crate::types::{ascii, DataType, Value};

use super::source::{unexpected_eof, Source};
use super::{Formats, PageExtent, RowCount, ROW_COUNT_WIDTH};

// =============================================================================
// Writing
// =============================================================================

/// Append the page preamble (everything before the rows)
///
/// Returns the offset within `out` at which the row count field starts.
pub(crate) fn encode_preamble(
    out: &mut String,
    layout: &Layout,
    formats: &Formats,
    page: &Page,
    number: u64,
    row_count: RowCount,
    values_per_line: usize,
) -> usize {
    out.push_str(&format!("! page number {}\n", number));

    for (i, def) in layout.parameters().iter().enumerate() {
        if def.fixed_value.is_some() {
            continue;
        }
        out.push_str(&ascii::encode_token(&page.parameters[i], formats.parameters[i].as_ref()));
        out.push('\n');
    }

    for (i, array) in page.arrays.iter().enumerate() {
        let dims: Vec<String> = array.dimensions.iter().map(usize::to_string).collect();
        out.push_str(&dims.join(" "));
        out.push('\n');

        let format = formats.arrays[i].as_ref();
        let values: Vec<String> = array
            .data
            .iter()
            .map(|v| ascii::encode_token(&v, format))
            .collect();
        for line in values.chunks(values_per_line.max(1)) {
            out.push_str(&line.join(" "));
            out.push('\n');
        }
    }

    let at = out.len();
    match row_count {
        RowCount::Final(rows) => out.push_str(&rows.to_string()),
        RowCount::Updatable(rows) => out.push_str(&row_count_field(rows)),
    }
    out.push('\n');
    at
}

/// Append one line per row in `rows`
pub(crate) fn encode_rows(out: &mut String, page: &Page, formats: &Formats, rows: Range<usize>) {
    if page.columns.is_empty() {
        return;
    }
    for row in rows {
        for (i, column) in page.columns.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if let Some(value) = column.get(row) {
                out.push_str(&ascii::encode_token(&value, formats.columns[i].as_ref()));
            }
        }
        out.push('\n');
    }
}

/// Row count text of fixed width
pub(crate) fn row_count_field(rows: usize) -> String {
    format!("{:>width$}", rows, width = ROW_COUNT_WIDTH)
}

// =============================================================================
// Reading
// =============================================================================

/// Data lines of one page, split into tokens on demand
struct Tokens<'a, R> {
    src: &'a mut Source<R>,
    pending: String,
}

impl<'a, R: BufRead> Tokens<'a, R> {
    fn new(src: &'a mut Source<R>) -> Self {
        Self {
            src,
            pending: String::new(),
        }
    }

    /// Next line that is neither blank nor a comment
    fn line(&mut self) -> Result<Option<String>> {
        self.pending.clear();
        while let Some(line) = self.src.read_line()? {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('!') {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
        Ok(None)
    }

    fn require_line(&mut self, what: &str) -> Result<String> {
        self.line()?.ok_or_else(|| unexpected_eof(what))
    }

    /// Next token, continuing onto following lines when the current one is used up
    fn token(&mut self, what: &str) -> Result<String> {
        loop {
            if let Some((raw, rest)) = ascii::split_token(&self.pending)? {
                let token = ascii::unquote(raw)?;
                self.pending = rest.to_string();
                return Ok(token);
            }
            let line = self.require_line(what)?;
            self.pending = line;
        }
    }

    /// Discard the rest of the current line
    fn end_line(&mut self) {
        self.pending.clear();
    }
}

fn parse_count(text: &str, what: &str) -> Result<usize> {
    text.trim()
        .parse()
        .map_err(|_| SddsError::Format(format!("Invalid {} {:?}", what, text.trim())))
}

/// Read one page; `None` when the stream holds no further data lines
pub(crate) fn decode_page<R: BufRead>(
    src: &mut Source<R>,
    layout: &Layout,
    fixed: &[Option<Value>],
) -> Result<Option<(Page, PageExtent)>> {
    let start = src.position();
    let mut tokens = Tokens::new(src);
    let mut first = match tokens.line()? {
        Some(line) => Some(line),
        None => return Ok(None),
    };
    let mut next_line = |tokens: &mut Tokens<'_, R>, what: &str| -> Result<String> {
        match first.take() {
            Some(line) => Ok(line),
            None => tokens.require_line(what),
        }
    };

    let mut parameters = Vec::with_capacity(layout.parameter_count());
    for (i, def) in layout.parameters().iter().enumerate() {
        if let Some(value) = &fixed[i] {
            parameters.push(value.clone());
            continue;
        }
        let line = next_line(&mut tokens, "parameter")?;
        let value = if def.data_type == DataType::String && !line.starts_with('"') {
            Value::String(line)
        } else {
            let (raw, _) = ascii::split_token(&line)?
                .ok_or_else(|| unexpected_eof("parameter"))?;
            ascii::decode_token(&ascii::unquote(raw)?, def.data_type)?
        };
        parameters.push(value);
    }

    let mut arrays = Vec::with_capacity(layout.array_count());
    for def in layout.arrays() {
        let line = next_line(&mut tokens, "array dimensions")?;
        let dimensions = line
            .split_whitespace()
            .map(|d| parse_count(d, "array dimension"))
            .collect::<Result<Vec<usize>>>()?;
        if dimensions.len() != def.dimensions as usize {
            return Err(SddsError::Format(format!(
                "Array {} expects {} dimensions, found {}",
                def.name,
                def.dimensions,
                dimensions.len()
            )));
        }

        let count = element_count(&dimensions)?;
        let mut data = ValueBuffer::with_capacity(def.data_type, count.min(1 << 16));
        for _ in 0..count {
            let token = tokens.token("array element")?;
            data.push(ascii::decode_token(&token, def.data_type)?)?;
        }
        tokens.end_line();
        arrays.push(ArrayValue::new(dimensions, data)?);
    }

    let line = next_line(&mut tokens, "row count")?;
    let rows = parse_count(&line, "row count")?;

    let mut columns: Vec<ValueBuffer> = layout
        .columns()
        .iter()
        .map(|d| ValueBuffer::with_capacity(d.data_type, rows.min(1 << 16)))
        .collect();
    if !columns.is_empty() {
        for _ in 0..rows {
            for (column, def) in columns.iter_mut().zip(layout.columns()) {
                let token = tokens.token("row")?;
                column.push(ascii::decode_token(&token, def.data_type)?)?;
            }
            tokens.end_line();
        }
    }

    let end = tokens.src.position();
    let page = Page {
        parameters,
        arrays,
        columns,
    };
    let rows = page.row_count()?;
    Ok(Some((
        page,
        PageExtent {
            start,
            end,
            rows,
            escaped: false,
        },
    )))
}
