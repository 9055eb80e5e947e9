//! Dataset Writer
//!
//! Accumulates a layout, writes the header once, then writes pages.
//!
//! ## Page Lifecycle
//! ```text
//! start_page(hint)
//!   set_parameter / set_array / set_column / set_row_values ...
//!   [update_page(mode)]*     rows so far go to disk, row count rewritten in place
//! write_page()               remaining rows go to disk, page closed
//! ```
//!
//! A page is encoded into one buffer and handed to the file with a single
//! `write_all`. Pages that have been partially flushed by `update_page` keep
//! the offset of their row count so it can be rewritten as rows are added.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{Result, SddsError};
use crate::layout::{ArrayDefinition, ColumnDefinition, Description, Layout, ParameterDefinition};
use crate::page::{ArrayValue, Page, ValueBuffer};
use crate::registry::HandleSlot;
use crate::types::{ByteOrder, DataMode, DataType, Value};

use super::header::{self, Header};
use super::{ascii, binary, Formats, RowCount, UpdateMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriterState {
    /// Layout may still change
    Defining,
    /// Header written, no page in progress
    Ready,
    /// A page is being built
    PageActive,
    Terminated,
}

/// The page currently being built
#[derive(Debug)]
pub(crate) struct ActivePage {
    /// 1-based ordinal in the file
    pub number: u64,
    pub page: Page,
    /// Row limit in fixed row count mode
    pub capacity: Option<usize>,
    /// Rows at the front of `page` that are already on disk
    pub buffered_on_disk: usize,
    /// Rows of this page on disk in total
    pub disk_rows: usize,
    /// File offset of the row count field once the preamble is on disk
    pub row_count_at: Option<u64>,
}

/// Writing handle over one dataset
pub struct SddsWriter {
    pub(crate) path: PathBuf,
    pub(crate) writer: BufWriter<File>,
    pub(crate) config: Config,
    pub(crate) description: Description,
    pub(crate) layout: Layout,
    pub(crate) mode: DataMode,
    pub(crate) column_major: bool,
    pub(crate) fixed_row_count: bool,
    pub(crate) fsync: bool,
    pub(crate) state: WriterState,
    /// Current end of written data
    pub(crate) offset: u64,
    /// Pages completed in the file
    pub(crate) pages_written: u64,
    pub(crate) active: Option<ActivePage>,
    pub(crate) formats: Formats,
    pub(crate) slot: Option<HandleSlot>,
}

impl SddsWriter {
    /// Create (or truncate) a dataset file
    pub fn create(
        path: &Path,
        mode: DataMode,
        description: Description,
        config: Config,
        slot: Option<HandleSlot>,
    ) -> Result<Self> {
        let file = File::create(path).map_err(|e| SddsError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), mode = mode.name(), "Opened dataset for writing");

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            column_major: config.column_major,
            fsync: config.fsync,
            config,
            description,
            layout: Layout::new(),
            mode,
            fixed_row_count: false,
            state: WriterState::Defining,
            offset: 0,
            pages_written: 0,
            active: None,
            formats: Formats::default(),
            slot,
        })
    }

    // -------------------------------------------------------------------------
    // Options
    // -------------------------------------------------------------------------

    fn ensure_defining(&self, what: &str) -> Result<()> {
        match self.state {
            WriterState::Defining => Ok(()),
            WriterState::Terminated => Err(terminated()),
            _ => Err(SddsError::Protocol(format!(
                "{} must precede write_layout",
                what
            ))),
        }
    }

    /// Write columns one after another (binary only)
    pub fn set_column_major_order(&mut self) -> Result<()> {
        self.ensure_defining("set_column_major_order")?;
        self.column_major = true;
        Ok(())
    }

    pub fn set_row_major_order(&mut self) -> Result<()> {
        self.ensure_defining("set_row_major_order")?;
        self.column_major = false;
        Ok(())
    }

    /// Fix each page's row count at `start_page` time
    pub fn set_fixed_row_count_mode(&mut self) -> Result<()> {
        self.ensure_defining("set_fixed_row_count_mode")?;
        self.fixed_row_count = true;
        Ok(())
    }

    /// Sync file data after every page write and update
    pub fn enable_fsync(&mut self) -> Result<()> {
        self.ensure_not_terminated()?;
        self.fsync = true;
        Ok(())
    }

    pub fn disable_fsync(&mut self) -> Result<()> {
        self.ensure_not_terminated()?;
        self.fsync = false;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    pub fn define_parameter(&mut self, definition: ParameterDefinition) -> Result<usize> {
        self.ensure_defining("define_parameter")?;
        self.layout.define_parameter(definition)
    }

    pub fn define_array(&mut self, definition: ArrayDefinition) -> Result<usize> {
        self.ensure_defining("define_array")?;
        self.layout.define_array(definition)
    }

    pub fn define_column(&mut self, definition: ColumnDefinition) -> Result<usize> {
        self.ensure_defining("define_column")?;
        self.layout.define_column(definition)
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

    /// Serialize the header; the layout is frozen from here on
    pub fn write_layout(&mut self) -> Result<()> {
        match self.state {
            WriterState::Defining => {}
            WriterState::Terminated => return Err(terminated()),
            _ => return Err(SddsError::Protocol("Layout already written".to_string())),
        }

        let formats = Formats::for_layout(&self.layout)?;
        let column_major = self.column_major && self.mode == DataMode::Binary;
        let header = Header {
            version: self.layout.required_version(column_major),
            description: self.description.clone(),
            layout: self.layout.clone(),
            mode: self.mode,
            column_major,
            fixed_row_count: self.fixed_row_count,
            byte_order: ByteOrder::Little,
        };
        let text = header::render(&header);
        self.emit(text.as_bytes())?;
        self.writer.flush()?;

        self.formats = formats;
        self.state = WriterState::Ready;
        debug!(
            path = %self.path.display(),
            version = header.version,
            bytes = text.len(),
            "Wrote layout"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Page building
    // -------------------------------------------------------------------------

    /// Begin a new page; `row_hint` is the expected row count, or the fixed
    /// capacity in fixed row count mode
    pub fn start_page(&mut self, row_hint: usize) -> Result<()> {
        match self.state {
            WriterState::Ready => {}
            WriterState::PageActive => {
                if self.active.as_ref().is_some_and(|a| a.row_count_at.is_some()) {
                    return Err(SddsError::Protocol(
                        "Current page is partially written; finish it with write_page".to_string(),
                    ));
                }
                debug!("Discarding unwritten page");
            }
            WriterState::Defining => {
                return Err(SddsError::Protocol("write_layout must precede start_page".to_string()))
            }
            WriterState::Terminated => return Err(terminated()),
        }

        let number = self.pages_written + 1;
        self.active = Some(ActivePage {
            number,
            page: Page::with_row_capacity(&self.layout, row_hint),
            capacity: self.fixed_row_count.then_some(row_hint),
            buffered_on_disk: 0,
            disk_rows: 0,
            row_count_at: None,
        });
        self.state = WriterState::PageActive;
        debug!(page = number, row_hint, "Started page");
        Ok(())
    }

    fn active_mut(&mut self) -> Result<&mut ActivePage> {
        match self.state {
            WriterState::PageActive => {}
            WriterState::Terminated => return Err(terminated()),
            _ => return Err(SddsError::Protocol("No page has been started".to_string())),
        }
        self.active
            .as_mut()
            .ok_or_else(|| SddsError::Protocol("No page has been started".to_string()))
    }

    /// The page being built
    pub fn page(&self) -> Option<&Page> {
        self.active.as_ref().map(|a| &a.page)
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.layout.require_parameter(name)?;
        self.set_parameter_by_index(index, value)
    }

    pub fn set_parameter_by_index(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let data_type = self
            .layout
            .parameter_at(index)
            .map(|d| d.data_type)
            .ok_or_else(|| SddsError::unknown_parameter(&index.to_string()))?;
        let value = value.into().coerce(data_type)?;
        let active = self.active_mut()?;
        if active.row_count_at.is_some() {
            return Err(SddsError::Protocol(
                "Parameters are frozen once the page has been flushed".to_string(),
            ));
        }
        active.page.parameters[index] = value;
        Ok(())
    }

    /// Set an array's elements (flattened, last index fastest) and dimensions
    pub fn set_array(&mut self, name: &str, data: impl Into<ValueBuffer>, dimensions: &[usize]) -> Result<()> {
        let index = self.layout.require_array(name)?;
        self.set_array_by_index(index, data, dimensions)
    }

    pub fn set_array_by_index(
        &mut self,
        index: usize,
        data: impl Into<ValueBuffer>,
        dimensions: &[usize],
    ) -> Result<()> {
        let def = self
            .layout
            .array_at(index)
            .ok_or_else(|| SddsError::unknown_array(&index.to_string()))?;
        if dimensions.len() != def.dimensions as usize {
            return Err(SddsError::InconsistentPage(format!(
                "Array {} has {} dimensions, got {}",
                def.name,
                def.dimensions,
                dimensions.len()
            )));
        }
        let data = data.into().convert(def.data_type)?;
        let array = ArrayValue::new(dimensions.to_vec(), data)?;

        let active = self.active_mut()?;
        if active.row_count_at.is_some() {
            return Err(SddsError::Protocol(
                "Arrays are frozen once the page has been flushed".to_string(),
            ));
        }
        active.page.arrays[index] = array;
        Ok(())
    }

    /// Replace a whole column
    pub fn set_column(&mut self, name: &str, data: impl Into<ValueBuffer>) -> Result<()> {
        let index = self.layout.require_column(name)?;
        self.set_column_by_index(index, data)
    }

    pub fn set_column_by_index(&mut self, index: usize, data: impl Into<ValueBuffer>) -> Result<()> {
        let data_type = self
            .layout
            .column_at(index)
            .map(|d| d.data_type)
            .ok_or_else(|| SddsError::unknown_column(&index.to_string()))?;
        let data = data.into().convert(data_type)?;

        let active = self.active_mut()?;
        if let Some(capacity) = active.capacity {
            if data.len() > capacity {
                return Err(SddsError::RowBounds {
                    row: data.len() - 1,
                    capacity,
                });
            }
        }
        if active.buffered_on_disk > 0 {
            return Err(SddsError::Protocol(
                "Cannot replace a column whose rows have been flushed".to_string(),
            ));
        }
        active.page.columns[index] = data;
        Ok(())
    }

    /// Set one row across the named columns, growing every column as needed
    ///
    /// All names and values are checked before anything changes.
    pub fn set_row_values(&mut self, row: usize, values: &[(&str, Value)]) -> Result<()> {
        let mut resolved = Vec::with_capacity(values.len());
        for (name, value) in values {
            let index = self.layout.require_column(name)?;
            let data_type = self.layout.columns()[index].data_type;
            resolved.push((index, value.clone().coerce(data_type)?));
        }

        let active = self.active_mut()?;
        if let Some(capacity) = active.capacity {
            if row >= capacity {
                return Err(SddsError::RowBounds { row, capacity });
            }
        }
        if row < active.buffered_on_disk {
            return Err(SddsError::Protocol(format!(
                "Row {} has already been flushed",
                row
            )));
        }

        let len = active.page.row_count().unwrap_or(0).max(row + 1);
        for column in &mut active.page.columns {
            if column.len() < len {
                column.resize(len);
            }
        }
        for (index, value) in resolved {
            active.page.columns[index].set(row, value)?;
        }
        trace!(page = active.number, row, "Set row values");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Page output
    // -------------------------------------------------------------------------

    /// Flush buffered rows without closing the page
    pub fn update_page(&mut self, mode: UpdateMode) -> Result<()> {
        self.active_mut()?;
        if self.mode == DataMode::Binary && self.column_major {
            return Err(SddsError::Protocol(
                "Column-major pages cannot be updated".to_string(),
            ));
        }

        let rows = self.flush_rows()?;
        if let Some(active) = self.active.as_mut() {
            match mode {
                UpdateMode::Update => active.buffered_on_disk = rows,
                UpdateMode::FlushTable => {
                    active.page.clear_rows();
                    active.buffered_on_disk = 0;
                }
            }
            trace!(page = active.number, disk_rows = active.disk_rows, ?mode, "Updated page");
        }
        self.sync()
    }

    /// Write the active page and close it, returning its page number
    ///
    /// Nothing is written if the page is inconsistent; the page stays active
    /// and the page counter is unchanged.
    pub fn write_page(&mut self) -> Result<u64> {
        self.active_mut()?;
        let flushed = match self.active.as_ref() {
            Some(active) => {
                active.page.validate(&self.layout)?;
                active.row_count_at.is_some()
            }
            None => false,
        };

        if flushed {
            self.flush_rows()?;
        } else {
            self.write_whole_page()?;
        }
        self.sync()?;

        let active = self.active.take();
        let number = active.as_ref().map(|a| a.number).unwrap_or(self.pages_written + 1);
        self.pages_written = number;
        self.state = WriterState::Ready;
        debug!(
            page = number,
            rows = active.map(|a| a.disk_rows).unwrap_or(0),
            "Wrote page"
        );
        Ok(number)
    }

    /// Encode a page that has never been flushed in one piece
    fn write_whole_page(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let rows = active.page.row_count()?;
        let row_count = if self.fixed_row_count {
            RowCount::Updatable(rows)
        } else {
            RowCount::Final(rows)
        };

        let bytes = match self.mode {
            DataMode::Ascii => {
                let mut out = String::new();
                ascii::encode_preamble(
                    &mut out,
                    &self.layout,
                    &self.formats,
                    &active.page,
                    active.number,
                    row_count,
                    self.config.ascii_values_per_line,
                );
                ascii::encode_rows(&mut out, &active.page, &self.formats, 0..rows);
                out.into_bytes()
            }
            DataMode::Binary => {
                let mut buf = BytesMut::new();
                binary::encode_preamble(&mut buf, &self.layout, &active.page, row_count, ByteOrder::Little)?;
                if self.column_major {
                    binary::encode_columns(&mut buf, &active.page, ByteOrder::Little)?;
                } else {
                    binary::encode_rows(&mut buf, &active.page, 0..rows, ByteOrder::Little)?;
                }
                buf.to_vec()
            }
        };

        self.emit(&bytes)?;
        self.writer.flush()?;
        if let Some(active) = self.active.as_mut() {
            active.disk_rows = rows;
            active.buffered_on_disk = rows;
        }
        Ok(())
    }

    /// Append buffered rows not yet on disk and rewrite the row count
    ///
    /// Writes the preamble first if this page has none on disk yet. Returns
    /// the number of buffered rows.
    fn flush_rows(&mut self) -> Result<usize> {
        let Some(active) = self.active.as_mut() else {
            return Ok(0);
        };
        let rows = active.page.row_count()?;
        let new_rows = active.buffered_on_disk..rows;
        let disk_rows = active.disk_rows + new_rows.len();
        binary::updatable_row_count(disk_rows)?;

        let mut preamble_at = None;
        let bytes = match self.mode {
            DataMode::Ascii => {
                let mut out = String::new();
                if active.row_count_at.is_none() {
                    preamble_at = Some(ascii::encode_preamble(
                        &mut out,
                        &self.layout,
                        &self.formats,
                        &active.page,
                        active.number,
                        RowCount::Updatable(disk_rows),
                        self.config.ascii_values_per_line,
                    ));
                }
                ascii::encode_rows(&mut out, &active.page, &self.formats, new_rows);
                out.into_bytes()
            }
            DataMode::Binary => {
                let mut buf = BytesMut::new();
                if active.row_count_at.is_none() {
                    binary::encode_preamble(
                        &mut buf,
                        &self.layout,
                        &active.page,
                        RowCount::Updatable(disk_rows),
                        ByteOrder::Little,
                    )?;
                    preamble_at = Some(0);
                }
                binary::encode_rows(&mut buf, &active.page, new_rows, ByteOrder::Little)?;
                buf.to_vec()
            }
        };

        let row_count_at = match (active.row_count_at, preamble_at) {
            (Some(at), _) => at,
            (None, Some(relative)) => self.offset + relative as u64,
            (None, None) => self.offset,
        };

        self.emit(&bytes)?;
        self.rewrite_row_count(row_count_at, disk_rows)?;
        if let Some(active) = self.active.as_mut() {
            active.row_count_at = Some(row_count_at);
            active.disk_rows = disk_rows;
        }
        Ok(rows)
    }

    /// Overwrite the row count field at `at`, leaving the file positioned at the end
    fn rewrite_row_count(&mut self, at: u64, rows: usize) -> Result<()> {
        let bytes = match self.mode {
            DataMode::Ascii => ascii::row_count_field(rows).into_bytes(),
            DataMode::Binary => binary::updatable_row_count(rows)?.to_le_bytes().to_vec(),
        };
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(at))?;
        file.write_all(&bytes)?;
        file.seek(SeekFrom::Start(self.offset))?;
        Ok(())
    }

    pub(crate) fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        if self.fsync {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn is_column_major(&self) -> bool {
        self.column_major
    }

    pub fn is_fixed_row_count(&self) -> bool {
        self.fixed_row_count
    }

    pub fn is_fsync_enabled(&self) -> bool {
        self.fsync
    }

    /// Pages completed in the file
    pub fn pages_written(&self) -> u64 {
        self.pages_written
    }

    /// Registry index held by this writer, if any
    pub fn index(&self) -> Option<usize> {
        self.slot.as_ref().map(HandleSlot::index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    fn ensure_not_terminated(&self) -> Result<()> {
        if self.state == WriterState::Terminated {
            return Err(terminated());
        }
        Ok(())
    }

    /// Finish and close the dataset
    ///
    /// A page that has been partially flushed is completed; a page that was
    /// never flushed is discarded. A layout that was never written is written
    /// now so the file is a valid header-only dataset.
    pub fn terminate(&mut self) -> Result<()> {
        match self.state {
            WriterState::Terminated => return Err(terminated()),
            WriterState::Defining => self.write_layout()?,
            WriterState::PageActive => {
                let flushed = self.active.as_ref().is_some_and(|a| a.row_count_at.is_some());
                if flushed {
                    self.write_page()?;
                } else {
                    debug!("Discarding unwritten page at terminate");
                    self.active = None;
                }
            }
            WriterState::Ready => {}
        }

        self.writer.flush().map_err(|source| SddsError::Close {
            path: self.path.clone(),
            source,
        })?;
        if self.fsync {
            self.writer.get_ref().sync_data().map_err(|source| SddsError::Close {
                path: self.path.clone(),
                source,
            })?;
        }

        self.state = WriterState::Terminated;
        self.slot = None;
        debug!(path = %self.path.display(), pages = self.pages_written, "Terminated writer");
        Ok(())
    }
}

impl Drop for SddsWriter {
    fn drop(&mut self) {
        if self.state != WriterState::Terminated {
            warn!(path = %self.path.display(), "Writer dropped without terminate");
            let _ = self.writer.flush();
        }
    }
}

impl std::fmt::Debug for SddsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SddsWriter")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("pages_written", &self.pages_written)
            .field("index", &self.index())
            .finish()
    }
}

fn terminated() -> SddsError {
    SddsError::Protocol("Writer has been terminated".to_string())
}
