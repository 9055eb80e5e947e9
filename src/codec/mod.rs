//! Codec Module
//!
//! Byte streams to and from layouts and pages.
//!
//! ## Stream Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ SDDS<version>                                            │
//! │ !# little-endian          (binary)                       │
//! │ !# fixed-rowcount         (fixed row count mode)         │
//! │ &description ... &end                                    │
//! │ &parameter ... &end       one line per definition        │
//! │ &array ... &end                                          │
//! │ &column ... &end                                         │
//! │ &data mode=ascii|binary, [column_major_order=1,] &end    │
//! ├──────────────────────────────────────────────────────────┤
//! │ page 1                                                   │
//! │ page 2                                                   │
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Handle States
//! ```text
//! SddsWriter:  Defining ──write_layout──▶ Ready ──start_page──▶ PageActive
//!                                           ▲                      │
//!                                           └──────write_page──────┘
//!              any ──terminate──▶ Terminated
//!
//! SddsReader:  header parsed on open, then read_page until EndOfStream
//! ```

pub mod append;
mod ascii;
mod binary;
mod header;
mod reader;
mod source;
mod writer;

use crate::error::Result;
use crate::layout::Layout;
use crate::types::{FormatSpec, Value};

pub use reader::SddsReader;
pub use writer::SddsWriter;

/// Highest header version understood
pub const MAX_VERSION: u32 = 5;

/// Width of an ASCII row count that may be rewritten in place
pub const ROW_COUNT_WIDTH: usize = 20;

/// Outcome of a page read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRead {
    /// A page was read; carries its 1-based ordinal in the file
    Page(u64),
    /// No more pages
    EndOfStream,
    /// The next page is damaged; the stream cannot be read further
    Corrupt,
}

impl PageRead {
    /// Ordinal of the page read, if any
    pub fn page_number(self) -> Option<u64> {
        match self {
            PageRead::Page(n) => Some(n),
            _ => None,
        }
    }
}

/// How `update_page` treats the rows it has flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Keep flushed rows in memory; new rows continue after them
    Update,
    /// Drop flushed rows from memory; row indices restart at 0
    FlushTable,
}

/// Byte range and row count of one page in a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageExtent {
    pub start: u64,
    pub end: u64,
    pub rows: usize,
    /// Binary row count used the `i32::MIN` + `i64` escape
    pub escaped: bool,
}

/// Row count form of a page being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowCount {
    /// Written once; binary switches to the escaped form above `i32::MAX`
    Final(usize),
    /// Fixed width so it can be rewritten in place
    Updatable(usize),
}

/// Parsed format strings of a layout, in definition order
#[derive(Debug, Clone, Default)]
pub(crate) struct Formats {
    pub parameters: Vec<Option<FormatSpec>>,
    pub arrays: Vec<Option<FormatSpec>>,
    pub columns: Vec<Option<FormatSpec>>,
}

impl Formats {
    pub fn for_layout(layout: &Layout) -> Result<Self> {
        Ok(Self {
            parameters: layout
                .parameters()
                .iter()
                .map(|d| d.format_spec())
                .collect::<Result<_>>()?,
            arrays: layout
                .arrays()
                .iter()
                .map(|d| d.format_spec())
                .collect::<Result<_>>()?,
            columns: layout
                .columns()
                .iter()
                .map(|d| d.format_spec())
                .collect::<Result<_>>()?,
        })
    }
}

/// Fixed value of every parameter, `None` for those stored per page
pub(crate) fn fixed_values(layout: &Layout) -> Result<Vec<Option<Value>>> {
    layout.parameters().iter().map(|d| d.fixed()).collect()
}
