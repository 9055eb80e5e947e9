//! In-memory multi-page dataset
//!
//! Values are kept per field, one entry per page:
//!
//! ```text
//! parameters[p][page]   Value
//! arrays[a][page]       ArrayValue
//! columns[c][page]      ValueBuffer (rows)
//! ```
//!
//! Accessors are 1-based. Writing at exactly one past the end appends, writing
//! further out fails with `InvalidPage` / `InvalidRow`.

use std::path::Path;

use tracing::debug;

use crate::codec::{PageRead, SddsReader};
use crate::context::SddsContext;
use crate::error::{Result, SddsError};
use crate::layout::{ArrayDefinition, ColumnDefinition, Description, Layout, ParameterDefinition};
use crate::types::{DataMode, DataType, Value};

use super::{ArrayValue, Page, ValueBuffer};

/// Place `value` at 1-based `position` of `list`: overwrite, append at
/// `len + 1`, fail beyond
fn place<T>(list: &mut Vec<T>, position: usize, value: T, error: fn(usize) -> SddsError) -> Result<()> {
    if position == 0 || position > list.len() + 1 {
        return Err(error(position));
    }
    if position == list.len() + 1 {
        list.push(value);
    } else {
        list[position - 1] = value;
    }
    Ok(())
}

fn fetch<T>(list: &[T], position: usize, error: fn(usize) -> SddsError) -> Result<&T> {
    position
        .checked_sub(1)
        .and_then(|i| list.get(i))
        .ok_or_else(|| error(position))
}

/// A dataset held entirely in memory
#[derive(Debug, Clone, PartialEq)]
pub struct PageStore {
    description: Description,
    layout: Layout,
    mode: DataMode,
    parameters: Vec<Vec<Value>>,
    arrays: Vec<Vec<ArrayValue>>,
    columns: Vec<Vec<ValueBuffer>>,
}

impl PageStore {
    pub fn new(mode: DataMode) -> Self {
        Self {
            description: Description::default(),
            layout: Layout::new(),
            mode,
            parameters: Vec::new(),
            arrays: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn set_description(&mut self, description: Description) {
        self.description = description;
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DataMode) {
        self.mode = mode;
    }

    // -------------------------------------------------------------------------
    // Definitions
    // -------------------------------------------------------------------------

    pub fn define_parameter(&mut self, definition: ParameterDefinition) -> Result<usize> {
        let ordinal = self.layout.define_parameter(definition)?;
        self.parameters.push(Vec::new());
        Ok(ordinal)
    }

    pub fn define_array(&mut self, definition: ArrayDefinition) -> Result<usize> {
        let ordinal = self.layout.define_array(definition)?;
        self.arrays.push(Vec::new());
        Ok(ordinal)
    }

    pub fn define_column(&mut self, definition: ColumnDefinition) -> Result<usize> {
        let ordinal = self.layout.define_column(definition)?;
        self.columns.push(Vec::new());
        Ok(ordinal)
    }

    pub fn define_simple_parameter(&mut self, name: &str, data_type: DataType) -> Result<usize> {
        self.define_parameter(ParameterDefinition::new(name, data_type))
    }

    pub fn define_simple_array(&mut self, name: &str, data_type: DataType, dimensions: u32) -> Result<usize> {
        self.define_array(ArrayDefinition::new(name, data_type, dimensions))
    }

    pub fn define_simple_column(&mut self, name: &str, data_type: DataType) -> Result<usize> {
        self.define_column(ColumnDefinition::new(name, data_type))
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    /// Replace the values of a parameter on every page
    pub fn set_parameter_values(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        let index = self.layout.require_parameter(name)?;
        let data_type = self.layout.parameters()[index].data_type;
        self.parameters[index] = values
            .into_iter()
            .map(|v| v.coerce(data_type))
            .collect::<Result<_>>()?;
        Ok(())
    }

    pub fn parameter_values(&self, name: &str) -> Result<&[Value]> {
        let index = self.layout.require_parameter(name)?;
        Ok(&self.parameters[index])
    }

    pub fn set_parameter_value(&mut self, name: &str, page: usize, value: impl Into<Value>) -> Result<()> {
        let index = self.layout.require_parameter(name)?;
        let value = value.into().coerce(self.layout.parameters()[index].data_type)?;
        place(&mut self.parameters[index], page, value, SddsError::InvalidPage)
    }

    pub fn parameter_value(&self, name: &str, page: usize) -> Result<&Value> {
        let index = self.layout.require_parameter(name)?;
        fetch(&self.parameters[index], page, SddsError::InvalidPage)
    }

    // -------------------------------------------------------------------------
    // Arrays
    // -------------------------------------------------------------------------

    fn conform_array(&self, index: usize, array: ArrayValue) -> Result<ArrayValue> {
        let def = &self.layout.arrays()[index];
        if array.dimensions.len() != def.dimensions as usize {
            return Err(SddsError::InconsistentPage(format!(
                "Array {} has {} dimensions, got {}",
                def.name,
                def.dimensions,
                array.dimensions.len()
            )));
        }
        ArrayValue::new(array.dimensions, array.data.convert(def.data_type)?)
    }

    pub fn set_array_values(&mut self, name: &str, values: Vec<ArrayValue>) -> Result<()> {
        let index = self.layout.require_array(name)?;
        let values = values
            .into_iter()
            .map(|a| self.conform_array(index, a))
            .collect::<Result<_>>()?;
        self.arrays[index] = values;
        Ok(())
    }

    pub fn array_values(&self, name: &str) -> Result<&[ArrayValue]> {
        let index = self.layout.require_array(name)?;
        Ok(&self.arrays[index])
    }

    pub fn set_array_value(&mut self, name: &str, page: usize, value: ArrayValue) -> Result<()> {
        let index = self.layout.require_array(name)?;
        let value = self.conform_array(index, value)?;
        place(&mut self.arrays[index], page, value, SddsError::InvalidPage)
    }

    pub fn array_value(&self, name: &str, page: usize) -> Result<&ArrayValue> {
        let index = self.layout.require_array(name)?;
        fetch(&self.arrays[index], page, SddsError::InvalidPage)
    }

    // -------------------------------------------------------------------------
    // Columns
    // -------------------------------------------------------------------------

    pub fn set_column_values(&mut self, name: &str, values: Vec<ValueBuffer>) -> Result<()> {
        let index = self.layout.require_column(name)?;
        let data_type = self.layout.columns()[index].data_type;
        self.columns[index] = values
            .into_iter()
            .map(|c| c.convert(data_type))
            .collect::<Result<_>>()?;
        Ok(())
    }

    pub fn column_values(&self, name: &str) -> Result<&[ValueBuffer]> {
        let index = self.layout.require_column(name)?;
        Ok(&self.columns[index])
    }

    pub fn set_column_page(&mut self, name: &str, page: usize, values: impl Into<ValueBuffer>) -> Result<()> {
        let index = self.layout.require_column(name)?;
        let values = values.into().convert(self.layout.columns()[index].data_type)?;
        place(&mut self.columns[index], page, values, SddsError::InvalidPage)
    }

    pub fn column_page(&self, name: &str, page: usize) -> Result<&ValueBuffer> {
        let index = self.layout.require_column(name)?;
        fetch(&self.columns[index], page, SddsError::InvalidPage)
    }

    /// Set one value; appends a page at `len + 1` and a row at `rows + 1`
    pub fn set_column_value(&mut self, name: &str, page: usize, row: usize, value: impl Into<Value>) -> Result<()> {
        let index = self.layout.require_column(name)?;
        let data_type = self.layout.columns()[index].data_type;
        let value = value.into().coerce(data_type)?;

        let pages = &mut self.columns[index];
        if page == pages.len() + 1 {
            // a new page starts at row 1
            if row != 1 {
                return Err(SddsError::InvalidRow(row));
            }
            let mut buffer = ValueBuffer::new(data_type);
            buffer.push(value)?;
            pages.push(buffer);
            return Ok(());
        }
        if page == 0 || page > pages.len() {
            return Err(SddsError::InvalidPage(page));
        }
        let buffer = &mut pages[page - 1];
        if row == 0 || row > buffer.len() + 1 {
            return Err(SddsError::InvalidRow(row));
        }
        if row == buffer.len() + 1 {
            buffer.push(value)
        } else {
            buffer.set(row - 1, value)
        }
    }

    pub fn column_value(&self, name: &str, page: usize, row: usize) -> Result<Value> {
        let buffer = self.column_page(name, page)?;
        row.checked_sub(1)
            .and_then(|i| buffer.get(i))
            .ok_or(SddsError::InvalidRow(row))
    }

    // -------------------------------------------------------------------------
    // Pages
    // -------------------------------------------------------------------------

    /// Number of pages; every field must hold the same number
    pub fn page_count(&self) -> Result<usize> {
        let mut counts = self
            .parameters
            .iter()
            .map(Vec::len)
            .chain(self.arrays.iter().map(Vec::len))
            .chain(self.columns.iter().map(Vec::len));
        let first = match counts.next() {
            Some(n) => n,
            None => return Ok(0),
        };
        if let Some(other) = counts.find(|n| *n != first) {
            return Err(SddsError::InconsistentPage(format!(
                "Fields hold different page counts ({} vs {})",
                first, other
            )));
        }
        Ok(first)
    }

    /// Check page counts and the row count of every page
    pub fn validate(&self) -> Result<()> {
        for number in 1..=self.page_count()? {
            self.page(number)?.validate(&self.layout)?;
        }
        Ok(())
    }

    /// Assemble page `number` (1-based)
    pub fn page(&self, number: usize) -> Result<Page> {
        let parameters = self
            .parameters
            .iter()
            .map(|pages| fetch(pages, number, SddsError::InvalidPage).cloned())
            .collect::<Result<_>>()?;
        let arrays = self
            .arrays
            .iter()
            .map(|pages| fetch(pages, number, SddsError::InvalidPage).cloned())
            .collect::<Result<_>>()?;
        let columns = self
            .columns
            .iter()
            .map(|pages| fetch(pages, number, SddsError::InvalidPage).cloned())
            .collect::<Result<_>>()?;
        Ok(Page {
            parameters,
            arrays,
            columns,
        })
    }

    /// Append a complete page
    pub fn push_page(&mut self, page: Page) -> Result<()> {
        page.validate(&self.layout)?;
        for (pages, value) in self.parameters.iter_mut().zip(page.parameters) {
            pages.push(value);
        }
        for (pages, array) in self.arrays.iter_mut().zip(page.arrays) {
            pages.push(array);
        }
        for (pages, column) in self.columns.iter_mut().zip(page.columns) {
            pages.push(column);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    fn shaped_like<R: std::io::BufRead>(reader: &SddsReader<R>) -> Self {
        let layout = reader.layout().clone();
        Self {
            description: reader.description().clone(),
            mode: reader.mode(),
            parameters: vec![Vec::new(); layout.parameter_count()],
            arrays: vec![Vec::new(); layout.array_count()],
            columns: vec![Vec::new(); layout.column_count()],
            layout,
        }
    }

    fn load_with<F>(ctx: &SddsContext, path: &Path, mut next: F) -> Result<Self>
    where
        F: FnMut(&mut SddsReader) -> Result<PageRead>,
    {
        let mut reader = ctx.initialize_input(path)?;
        let mut store = Self::shaped_like(&reader);

        loop {
            match next(&mut reader)? {
                PageRead::Page(_) => {
                    if let Some(page) = reader.take_page() {
                        store.push_page(page)?;
                    }
                }
                PageRead::EndOfStream => break,
                PageRead::Corrupt => {
                    return Err(SddsError::Format(format!(
                        "Corrupt page after page {} in {}",
                        reader.page_number(),
                        path.display()
                    )))
                }
            }
        }
        reader.terminate()?;

        debug!(path = %path.display(), pages = store.page_count()?, "Loaded dataset");
        Ok(store)
    }

    /// Read every page of a dataset
    ///
    /// A damaged page fails the whole load with `Format`; the pages read
    /// before it are not returned. The same holds for `load_sparse` and
    /// `load_last_rows`.
    pub fn load(ctx: &SddsContext, path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(ctx, path.as_ref(), |r| r.read_page())
    }

    /// Read pages `offset+1`, `offset+1+interval`, ...
    pub fn load_sparse(ctx: &SddsContext, path: impl AsRef<Path>, interval: u64, offset: u64) -> Result<Self> {
        Self::load_with(ctx, path.as_ref(), |r| r.read_page_sparse(interval, offset))
    }

    /// Read every page, keeping the last `rows` rows of each
    pub fn load_last_rows(ctx: &SddsContext, path: impl AsRef<Path>, rows: usize) -> Result<Self> {
        Self::load_with(ctx, path.as_ref(), |r| r.read_page_last_rows(rows))
    }

    /// Write the whole dataset to `path`
    pub fn save(&self, ctx: &SddsContext, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        let mut writer = ctx.initialize_output(path, self.mode, self.description.clone())?;
        for def in self.layout.parameters() {
            writer.define_parameter(def.clone())?;
        }
        for def in self.layout.arrays() {
            writer.define_array(def.clone())?;
        }
        for def in self.layout.columns() {
            writer.define_column(def.clone())?;
        }
        writer.write_layout()?;

        let pages = self.page_count()?;
        for number in 1..=pages {
            let page = self.page(number)?;
            writer.start_page(page.row_count()?)?;
            for (i, value) in page.parameters.into_iter().enumerate() {
                writer.set_parameter_by_index(i, value)?;
            }
            for (i, array) in page.arrays.into_iter().enumerate() {
                writer.set_array_by_index(i, array.data, &array.dimensions)?;
            }
            for (i, column) in page.columns.into_iter().enumerate() {
                writer.set_column_by_index(i, column)?;
            }
            writer.write_page()?;
        }
        writer.terminate()?;

        debug!(path = %path.display(), pages, "Saved dataset");
        Ok(())
    }
}
