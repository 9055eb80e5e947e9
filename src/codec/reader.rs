//! Dataset Reader
//!
//! Parses the header on open, then pulls pages one at a time.
//!
//! ## Page Selection
//! - `read_page`: every page in order
//! - `read_page_sparse(interval, offset)`: pages `offset+1`, `offset+1+interval`, ...
//! - `read_page_last_rows(n)`: every page, keeping only its last `n` rows
//!
//! The first page delivered must be the one asked for; a stream that ends or
//! breaks before it is a read failure rather than an empty result.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SddsError};
use crate::layout::{Description, Layout};
use crate::page::{ArrayValue, Page, ValueBuffer};
use crate::registry::HandleSlot;
use crate::types::{ByteOrder, DataMode, Value};

use super::header::{self, Header};
use super::source::{is_eof, Source};
use super::{ascii, binary, fixed_values, PageExtent, PageRead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Reading,
    Exhausted,
    Corrupt,
    Terminated,
}

/// Why the stream stopped at a damaged page
#[derive(Debug, Clone, PartialEq, Eq)]
enum Damage {
    /// Input ended inside the page
    Torn,
    /// The page holds data that does not decode
    Malformed(String),
}

/// Reading handle over one dataset
pub struct SddsReader<R: BufRead = BufReader<File>> {
    /// Where the data came from (for messages)
    path: PathBuf,
    /// Dropped on terminate
    source: Option<Source<R>>,
    header: Header,
    fixed: Vec<Option<Value>>,
    config: Config,
    state: ReaderState,
    damage: Option<Damage>,
    /// Current page, if one has been read
    page: Option<Page>,
    /// File ordinal of the current page (0 before the first read)
    page_number: u64,
    /// Pages consumed from the stream, including skipped ones
    pages_consumed: u64,
    /// Byte offset where page data starts
    data_start: u64,
    /// Extent of the last page consumed completely
    last_extent: Option<PageExtent>,
    slot: Option<HandleSlot>,
}

impl SddsReader<BufReader<File>> {
    /// Open a dataset file, retrying once after `config.open_retry_delay`
    pub fn open(path: &Path, config: Config, slot: Option<HandleSlot>) -> Result<Self> {
        match Self::open_once(path, &config) {
            Ok(reader) => Ok(reader.with_slot(slot)),
            Err(first) => {
                warn!(
                    path = %path.display(),
                    error = %first,
                    delay_ms = config.open_retry_delay.as_millis() as u64,
                    "Open failed, retrying once"
                );
                thread::sleep(config.open_retry_delay);
                let reader = Self::open_once(path, &config)?;
                Ok(reader.with_slot(slot))
            }
        }
    }

    /// Open without retrying
    pub(crate) fn open_once(path: &Path, config: &Config) -> Result<Self> {
        let file = File::open(path).map_err(|e| SddsError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::with_path(BufReader::new(file), path.to_path_buf(), config.clone())
    }
}

impl<R: BufRead> SddsReader<R> {
    /// Read a dataset from any buffered stream
    pub fn from_reader(reader: R, config: Config) -> Result<Self> {
        Self::with_path(reader, PathBuf::from("<stream>"), config)
    }

    fn with_path(reader: R, path: PathBuf, config: Config) -> Result<Self> {
        let mut source = Source::new(reader);
        let header = header::parse(&mut source).map_err(|e| match e {
            SddsError::Open { .. } => e,
            other => SddsError::Open {
                path: path.clone(),
                reason: other.to_string(),
            },
        })?;
        let fixed = fixed_values(&header.layout).map_err(|e| SddsError::Open {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            path = %path.display(),
            version = header.version,
            mode = header.mode.name(),
            parameters = header.layout.parameter_count(),
            arrays = header.layout.array_count(),
            columns = header.layout.column_count(),
            "Opened dataset for reading"
        );

        let data_start = source.position();
        Ok(Self {
            path,
            source: Some(source),
            header,
            fixed,
            config,
            state: ReaderState::Reading,
            damage: None,
            page: None,
            page_number: 0,
            pages_consumed: 0,
            data_start,
            last_extent: None,
            slot: None,
        })
    }

    fn with_slot(mut self, slot: Option<HandleSlot>) -> Self {
        self.slot = slot;
        self
    }

    // -------------------------------------------------------------------------
    // Page reading
    // -------------------------------------------------------------------------

    /// Read the next page
    pub fn read_page(&mut self) -> Result<PageRead> {
        self.ensure_open()?;
        let first = self.pages_consumed == 0;
        let result = self.next_page()?;
        if first {
            self.require_first(result, 1)?;
        }
        Ok(result)
    }

    /// Read every `interval`-th page starting at page `offset + 1`
    pub fn read_page_sparse(&mut self, interval: u64, offset: u64) -> Result<PageRead> {
        self.ensure_open()?;
        if interval == 0 {
            return Err(SddsError::Protocol("Sparse interval must be positive".to_string()));
        }

        let first = self.page_number == 0;
        let target = if first {
            offset + 1
        } else {
            self.page_number + interval
        };

        while self.pages_consumed + 1 < target {
            match self.skip_page()? {
                PageRead::Page(_) => {}
                other => {
                    self.page = None;
                    if first {
                        self.require_first(other, target)?;
                    }
                    return Ok(other);
                }
            }
        }

        let result = self.next_page()?;
        if first {
            self.require_first(result, target)?;
        }
        Ok(result)
    }

    /// Read the next page, keeping only its last `rows` rows
    pub fn read_page_last_rows(&mut self, rows: usize) -> Result<PageRead> {
        let result = self.read_page()?;
        if let (PageRead::Page(_), Some(page)) = (result, self.page.as_mut()) {
            page.keep_last_rows(rows);
        }
        Ok(result)
    }

    fn require_first(&self, result: PageRead, expected: u64) -> Result<()> {
        match result {
            PageRead::Page(n) if n == expected => Ok(()),
            other => Err(SddsError::Format(format!(
                "Expected page {} of {}, got {:?}",
                expected,
                self.path.display(),
                other
            ))),
        }
    }

    /// Parse the next page from the stream into `self.page`
    fn next_page(&mut self) -> Result<PageRead> {
        match self.state {
            ReaderState::Exhausted => return Ok(PageRead::EndOfStream),
            ReaderState::Corrupt => return Ok(PageRead::Corrupt),
            ReaderState::Terminated => {
                return Err(SddsError::Protocol("Reader has been terminated".to_string()))
            }
            ReaderState::Reading => {}
        }

        self.page = None;
        match self.decode_next() {
            Ok(Some((page, extent))) => {
                self.pages_consumed += 1;
                self.page_number = self.pages_consumed;
                self.last_extent = Some(extent);
                debug!(page = self.page_number, rows = extent.rows, "Read page");
                self.page = Some(page);
                Ok(PageRead::Page(self.page_number))
            }
            Ok(None) => {
                self.state = ReaderState::Exhausted;
                Ok(PageRead::EndOfStream)
            }
            Err(e) if is_eof(&e) || matches!(e, SddsError::Format(_) | SddsError::InconsistentPage(_)) => {
                warn!(
                    path = %self.path.display(),
                    page = self.pages_consumed + 1,
                    error = %e,
                    "Corrupt page"
                );
                self.state = ReaderState::Corrupt;
                self.damage = Some(if is_eof(&e) {
                    Damage::Torn
                } else {
                    Damage::Malformed(e.to_string())
                });
                Ok(PageRead::Corrupt)
            }
            Err(e) => Err(e),
        }
    }

    fn skip_page(&mut self) -> Result<PageRead> {
        let result = self.next_page()?;
        self.page = None;
        Ok(result)
    }

    fn decode_next(&mut self) -> Result<Option<(Page, PageExtent)>> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| SddsError::Protocol("Reader has been terminated".to_string()))?;
        match self.header.mode {
            DataMode::Ascii => ascii::decode_page(source, &self.header.layout, &self.fixed),
            DataMode::Binary => {
                let decoded = binary::decode_page(
                    source,
                    &self.header.layout,
                    &self.fixed,
                    self.header.byte_order,
                    self.header.column_major,
                    self.config.auto_recover,
                )?;
                Ok(decoded.map(|d| {
                    if d.recovered {
                        // nothing follows a torn page
                        self.state = ReaderState::Exhausted;
                    }
                    (d.page, d.extent)
                }))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    fn current(&self) -> Result<&Page> {
        self.ensure_open()?;
        self.page
            .as_ref()
            .ok_or_else(|| SddsError::Protocol("No page has been read".to_string()))
    }

    /// The current page
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Take ownership of the current page
    pub fn take_page(&mut self) -> Option<Page> {
        self.page.take()
    }

    pub fn parameter(&self, name: &str) -> Result<&Value> {
        let index = self.header.layout.require_parameter(name)?;
        Ok(&self.current()?.parameters[index])
    }

    pub fn parameter_by_index(&self, index: usize) -> Result<&Value> {
        self.current()?
            .parameters
            .get(index)
            .ok_or_else(|| SddsError::unknown_parameter(&index.to_string()))
    }

    pub fn array(&self, name: &str) -> Result<&ArrayValue> {
        let index = self.header.layout.require_array(name)?;
        Ok(&self.current()?.arrays[index])
    }

    pub fn array_by_index(&self, index: usize) -> Result<&ArrayValue> {
        self.current()?
            .arrays
            .get(index)
            .ok_or_else(|| SddsError::unknown_array(&index.to_string()))
    }

    pub fn array_dimensions(&self, name: &str) -> Result<&[usize]> {
        Ok(&self.array(name)?.dimensions)
    }

    pub fn column(&self, name: &str) -> Result<&ValueBuffer> {
        let index = self.header.layout.require_column(name)?;
        Ok(&self.current()?.columns[index])
    }

    pub fn column_by_index(&self, index: usize) -> Result<&ValueBuffer> {
        self.current()?
            .columns
            .get(index)
            .ok_or_else(|| SddsError::unknown_column(&index.to_string()))
    }

    /// Rows in the current page
    pub fn row_count(&self) -> Result<usize> {
        self.current()?.row_count()
    }

    pub fn layout(&self) -> &Layout {
        &self.header.layout
    }

    pub fn description(&self) -> &Description {
        &self.header.description
    }

    pub fn mode(&self) -> DataMode {
        self.header.mode
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    pub fn is_column_major(&self) -> bool {
        self.header.column_major
    }

    pub fn is_fixed_row_count(&self) -> bool {
        self.header.fixed_row_count
    }

    /// File ordinal of the current page, 0 before the first read
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Registry index held by this reader, if any
    pub fn index(&self) -> Option<usize> {
        self.slot.as_ref().map(HandleSlot::index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Close the stream and release the registry slot
    pub fn terminate(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = ReaderState::Terminated;
        self.page = None;
        self.source = None;
        self.slot = None;
        debug!(path = %self.path.display(), pages = self.pages_consumed, "Terminated reader");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == ReaderState::Terminated {
            return Err(SddsError::Protocol("Reader has been terminated".to_string()));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Append support
    // -------------------------------------------------------------------------

    pub(crate) fn header(&self) -> &Header {
        &self.header
    }

    /// Consume pages until the end of the stream or a torn final page
    ///
    /// Returns the number of complete pages and where the last one ends. A
    /// page that fails to decode for any reason other than input ending
    /// inside it is a `Format` error.
    pub(crate) fn scan_pages(&mut self) -> Result<(u64, u64, Option<PageExtent>)> {
        while let PageRead::Page(_) = self.skip_page()? {}
        if let Some(Damage::Malformed(reason)) = &self.damage {
            return Err(SddsError::Format(format!(
                "Page {} of {} is damaged: {}",
                self.pages_consumed + 1,
                self.path.display(),
                reason
            )));
        }
        let end = self
            .last_extent
            .map(|extent| extent.end)
            .unwrap_or(self.data_start);
        Ok((self.pages_consumed, end, self.last_extent))
    }
}

impl<R: BufRead> std::fmt::Debug for SddsReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SddsReader")
            .field("path", &self.path)
            .field("mode", &self.header.mode)
            .field("state", &self.state)
            .field("page_number", &self.page_number)
            .field("index", &self.index())
            .finish()
    }
}
