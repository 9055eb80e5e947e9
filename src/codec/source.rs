//! Position-tracking input
//!
//! Wraps a `BufRead` and counts consumed bytes so that the reader can report
//! exact page boundaries. Appending relies on those boundaries to find where
//! the last complete page ends.

use std::io::{self, BufRead, Read};

use crate::error::{Result, SddsError};

pub(crate) struct Source<R> {
    inner: R,
    position: u64,
}

impl<R: BufRead> Source<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True when no bytes are left
    pub fn at_eof(&mut self) -> Result<bool> {
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Read one line without its terminator
    ///
    /// Returns `None` at end of input. Both `\n` and `\r\n` endings are
    /// accepted.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut raw = Vec::new();
        let n = self.inner.read_until(b'\n', &mut raw)?;
        if n == 0 {
            return Ok(None);
        }
        self.position += n as u64;

        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }
        String::from_utf8(raw)
            .map(Some)
            .map_err(|e| SddsError::Format(format!("Line is not valid UTF-8: {}", e)))
    }
}

impl<R: BufRead> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

/// Error for input that ends in the middle of a record
pub(crate) fn unexpected_eof(what: &str) -> SddsError {
    SddsError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("End of input while reading {}", what),
    ))
}

/// True for errors caused by input ending early
pub(crate) fn is_eof(error: &SddsError) -> bool {
    matches!(error, SddsError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}
