//! Appending to existing datasets
//!
//! ## Opening for Append
//! 1. Scan the file: parse the header and every complete page
//! 2. Check the file can be appended to; nothing is modified before this
//! 3. Truncate a torn page at the end of the file, if any
//! 4. Reopen for writing, positioned after the last complete page
//!
//! A page that is damaged other than by being cut short fails the open and
//! leaves the file as it is.
//!
//! `open_append` adds whole new pages. `open_append_to_page` continues the
//! last page: its rows stay on disk, new rows go after them and the row
//! count is rewritten in place. That needs a binary, row-major file whose
//! last page has a plain 32-bit row count.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SddsError};
use crate::page::Page;
use crate::registry::HandleSlot;
use crate::types::{ByteOrder, DataMode};

use super::header::Header;
use super::writer::{ActivePage, SddsWriter, WriterState};
use super::{Formats, PageExtent, SddsReader};

/// What a scan found in an existing file
struct Scan {
    header: Header,
    pages: u64,
    data_end: u64,
    last: Option<PageExtent>,
}

fn scan(path: &Path, config: &Config) -> Result<Scan> {
    let scan_config = Config {
        auto_recover: false,
        ..config.clone()
    };
    let mut reader = SddsReader::open_once(path, &scan_config)?;
    let (pages, data_end, last) = reader.scan_pages()?;
    Ok(Scan {
        header: reader.header().clone(),
        pages,
        data_end,
        last,
    })
}

fn check_byte_order(scan: &Scan) -> Result<()> {
    if scan.header.mode == DataMode::Binary && scan.header.byte_order != ByteOrder::Little {
        return Err(SddsError::Protocol(
            "Cannot append to a big-endian dataset".to_string(),
        ));
    }
    Ok(())
}

/// Open `path` for writing at the end of its last complete page
fn reopen(path: &Path, scan: &Scan) -> Result<File> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| SddsError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let len = file.metadata()?.len();
    if len > scan.data_end {
        warn!(
            path = %path.display(),
            valid = scan.data_end,
            discarded = len - scan.data_end,
            "Truncating incomplete page at end of file"
        );
        file.set_len(scan.data_end)?;
    }

    if scan.header.mode == DataMode::Ascii && scan.data_end > 0 {
        file.seek(SeekFrom::Start(scan.data_end - 1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            file.write_all(b"\n")?;
        }
    }
    file.seek(SeekFrom::End(0))?;
    Ok(file)
}

impl SddsWriter {
    fn from_scan(path: &Path, scan: &Scan, file: File, config: Config, slot: Option<HandleSlot>) -> Result<Self> {
        let mut file = file;
        let offset = file.stream_position()?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            fsync: config.fsync,
            config,
            description: scan.header.description.clone(),
            layout: scan.header.layout.clone(),
            mode: scan.header.mode,
            column_major: scan.header.column_major,
            fixed_row_count: scan.header.fixed_row_count,
            state: WriterState::Ready,
            offset,
            pages_written: scan.pages,
            active: None,
            formats: Formats::for_layout(&scan.header.layout)?,
            slot,
        })
    }

    /// Open an existing dataset to add new pages after the last complete one
    pub fn open_append(path: &Path, config: Config, slot: Option<HandleSlot>) -> Result<Self> {
        let scan = scan(path, &config)?;
        check_byte_order(&scan)?;
        let file = reopen(path, &scan)?;
        let writer = Self::from_scan(path, &scan, file, config, slot)?;
        debug!(
            path = %path.display(),
            pages = scan.pages,
            offset = writer.offset,
            "Opened dataset for appending pages"
        );
        Ok(writer)
    }

    /// Open an existing dataset to add rows to its last page
    ///
    /// Returns the writer, positioned inside the last page, and the number
    /// of rows that page already holds. New rows are set starting at row 0
    /// of the writer's buffer.
    pub fn open_append_to_page(
        path: &Path,
        row_hint: usize,
        config: Config,
        slot: Option<HandleSlot>,
    ) -> Result<(Self, u64)> {
        let scan = scan(path, &config)?;

        if scan.header.mode != DataMode::Binary {
            return Err(SddsError::Protocol(
                "Appending to a page requires a binary dataset".to_string(),
            ));
        }
        check_byte_order(&scan)?;
        if scan.header.column_major {
            return Err(SddsError::Protocol(
                "Appending to a page requires row-major order".to_string(),
            ));
        }
        let last = scan.last.ok_or_else(|| {
            SddsError::Protocol("Dataset has no page to append to".to_string())
        })?;
        if last.escaped {
            return Err(SddsError::Protocol(
                "Last page row count cannot be updated in place".to_string(),
            ));
        }

        let file = reopen(path, &scan)?;
        let mut writer = Self::from_scan(path, &scan, file, config, slot)?;
        writer.pages_written = scan.pages - 1;
        writer.active = Some(ActivePage {
            number: scan.pages,
            page: Page::with_row_capacity(&writer.layout, row_hint),
            capacity: writer.fixed_row_count.then_some(row_hint),
            buffered_on_disk: 0,
            disk_rows: last.rows,
            row_count_at: Some(last.start),
        });
        writer.state = WriterState::PageActive;

        debug!(
            path = %path.display(),
            page = scan.pages,
            rows = last.rows,
            "Opened dataset for appending rows"
        );
        Ok((writer, last.rows as u64))
    }
}
