//! Sparse and last-rows page selection

use std::fs;
use std::io::{self, BufRead, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sdds::{Config, DataMode, PageRead, SddsError, SddsReader, Value, ValueBuffer};

use super::{context, page_values, setup_temp, write_pages};

#[test]
fn test_sparse_every_second_page() {
    for mode in [DataMode::Ascii, DataMode::Binary] {
        let (_temp, path) = setup_temp("sparse.sdds");
        let ctx = context();
        write_pages(&ctx, &path, mode, 5, 3);

        let mut reader = ctx.initialize_input(&path).unwrap();
        assert_eq!(reader.read_page_sparse(2, 1).unwrap(), PageRead::Page(2));
        assert_eq!(reader.parameter("page").unwrap(), &Value::Long(2));
        assert_eq!(reader.read_page_sparse(2, 1).unwrap(), PageRead::Page(4));
        assert_eq!(reader.column("v").unwrap(), &ValueBuffer::Long(page_values(4, 3)));
        assert_eq!(reader.read_page_sparse(2, 1).unwrap(), PageRead::EndOfStream);
    }
}

#[test]
fn test_sparse_interval_one_reads_everything() {
    let (_temp, path) = setup_temp("dense.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 3, 2);

    let mut reader = ctx.initialize_input(&path).unwrap();
    let mut seen = Vec::new();
    while let PageRead::Page(n) = reader.read_page_sparse(1, 0).unwrap() {
        seen.push(n);
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn test_sparse_offset_past_end_fails() {
    let (_temp, path) = setup_temp("short.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 2, 1);

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert!(matches!(reader.read_page_sparse(1, 5), Err(SddsError::Format(_))));
}

#[test]
fn test_sparse_zero_interval_rejected() {
    let (_temp, path) = setup_temp("zero.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Ascii, 1, 1);

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert!(matches!(reader.read_page_sparse(0, 0), Err(SddsError::Protocol(_))));
}

#[test]
fn test_last_rows() {
    for mode in [DataMode::Ascii, DataMode::Binary] {
        let (_temp, path) = setup_temp("tail.sdds");
        let ctx = context();
        write_pages(&ctx, &path, mode, 2, 5);

        let mut reader = ctx.initialize_input(&path).unwrap();
        assert_eq!(reader.read_page_last_rows(2).unwrap(), PageRead::Page(1));
        assert_eq!(reader.column("v").unwrap(), &ValueBuffer::Long(vec![13, 14]));
        assert_eq!(reader.read_page_last_rows(9).unwrap(), PageRead::Page(2));
        assert_eq!(reader.column("v").unwrap(), &ValueBuffer::Long(page_values(2, 5)));
        assert_eq!(reader.read_page_last_rows(2).unwrap(), PageRead::EndOfStream);
    }
}

#[test]
fn test_accessors_after_terminate() {
    let (_temp, path) = setup_temp("closed.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 1, 1);

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert!(matches!(reader.parameter("page"), Err(SddsError::Protocol(_))));
    reader.read_page().unwrap();
    reader.terminate().unwrap();
    assert!(matches!(reader.read_page(), Err(SddsError::Protocol(_))));
    assert!(matches!(reader.terminate(), Err(SddsError::Protocol(_))));
}

/// Stream that records when it is dropped
struct ClosingStream {
    inner: Cursor<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl Read for ClosingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for ClosingStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl Drop for ClosingStream {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_terminate_closes_stream() {
    let (_temp, path) = setup_temp("close.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 2, 2);

    let closed = Arc::new(AtomicBool::new(false));
    let stream = ClosingStream {
        inner: Cursor::new(fs::read(&path).unwrap()),
        closed: Arc::clone(&closed),
    };
    let mut reader = SddsReader::from_reader(stream, Config::default()).unwrap();
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert!(!closed.load(Ordering::SeqCst));

    reader.terminate().unwrap();
    assert!(closed.load(Ordering::SeqCst));
    assert!(matches!(reader.read_page(), Err(SddsError::Protocol(_))));
}
