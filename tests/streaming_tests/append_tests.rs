//! Appending pages and rows to existing datasets

use std::fs;

use sdds::{Config, DataMode, DataType, SddsContext, SddsError, Value, ValueBuffer};

use super::{context, page_values, read_columns, setup_temp, write_pages};

#[test]
fn test_append_new_page() {
    for mode in [DataMode::Ascii, DataMode::Binary] {
        let (_temp, path) = setup_temp("pages.sdds");
        let ctx = context();
        write_pages(&ctx, &path, mode, 2, 3);

        let mut writer = ctx.initialize_append(&path).unwrap();
        assert_eq!(writer.pages_written(), 2);
        assert_eq!(writer.layout().column_count(), 1);
        writer.start_page(2).unwrap();
        writer.set_parameter("page", 3i32).unwrap();
        writer.set_column("v", page_values(3, 2)).unwrap();
        assert_eq!(writer.write_page().unwrap(), 3);
        writer.terminate().unwrap();

        let columns = read_columns(&ctx, &path);
        assert_eq!(
            columns,
            vec![
                ValueBuffer::Long(page_values(1, 3)),
                ValueBuffer::Long(page_values(2, 3)),
                ValueBuffer::Long(page_values(3, 2)),
            ]
        );
    }
}

#[test]
fn test_append_page_numbering_in_ascii() {
    let (_temp, path) = setup_temp("numbered.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Ascii, 1, 1);

    let mut writer = ctx.initialize_append(&path).unwrap();
    writer.start_page(0).unwrap();
    writer.write_page().unwrap();
    writer.terminate().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("! page number 1\n"));
    assert!(text.contains("! page number 2\n"));
}

#[test]
fn test_append_to_header_only_dataset() {
    let (_temp, path) = setup_temp("header.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 0, 0);

    let mut writer = ctx.initialize_append(&path).unwrap();
    writer.start_page(1).unwrap();
    writer.set_column("v", vec![99i32]).unwrap();
    assert_eq!(writer.write_page().unwrap(), 1);
    writer.terminate().unwrap();

    assert_eq!(read_columns(&ctx, &path), vec![ValueBuffer::Long(vec![99i32])]);
}

#[test]
fn test_append_rows_to_last_page() {
    let (_temp, path) = setup_temp("rows.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 2, 4);

    let (mut writer, existing) = ctx.initialize_append_to_page(&path, 3).unwrap();
    assert_eq!(existing, 4);
    writer.set_column("v", vec![24i32, 25, 26]).unwrap();
    assert_eq!(writer.write_page().unwrap(), 2);
    writer.terminate().unwrap();

    let mut reader = ctx.initialize_input(&path).unwrap();
    reader.read_page().unwrap();
    assert_eq!(reader.row_count().unwrap(), 4);
    reader.read_page().unwrap();
    assert_eq!(reader.row_count().unwrap(), 7);
    assert_eq!(reader.parameter("page").unwrap(), &Value::Long(2));
    assert_eq!(reader.column("v").unwrap(), &ValueBuffer::Long(page_values(2, 7)));
}

#[test]
fn test_append_rows_then_new_page() {
    let (_temp, path) = setup_temp("rows_pages.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 1, 1);

    let (mut writer, _) = ctx.initialize_append_to_page(&path, 1).unwrap();
    writer.set_column("v", vec![11i32]).unwrap();
    writer.write_page().unwrap();
    writer.start_page(1).unwrap();
    writer.set_parameter("page", 2i32).unwrap();
    writer.set_column("v", vec![20i32]).unwrap();
    assert_eq!(writer.write_page().unwrap(), 2);
    writer.terminate().unwrap();

    assert_eq!(
        read_columns(&ctx, &path),
        vec![ValueBuffer::Long(vec![10, 11]), ValueBuffer::Long(vec![20])]
    );
}

#[test]
fn test_append_rows_rejected() {
    let (temp, ascii_path) = setup_temp("ascii.sdds");
    let ctx = context();
    write_pages(&ctx, &ascii_path, DataMode::Ascii, 1, 1);
    assert!(matches!(
        ctx.initialize_append_to_page(&ascii_path, 1),
        Err(SddsError::Protocol(_))
    ));

    let empty_path = temp.path().join("empty.sdds");
    write_pages(&ctx, &empty_path, DataMode::Binary, 0, 0);
    assert!(matches!(
        ctx.initialize_append_to_page(&empty_path, 1),
        Err(SddsError::Protocol(_))
    ));

    let columns_path = temp.path().join("columns.sdds");
    let column_ctx = SddsContext::new(Config::builder().column_major(true).build());
    write_pages(&column_ctx, &columns_path, DataMode::Binary, 1, 1);
    assert!(matches!(
        ctx.initialize_append_to_page(&columns_path, 1),
        Err(SddsError::Protocol(_))
    ));

    assert_eq!(ctx.registry().in_use(), 0);
}

#[test]
fn test_append_to_big_endian_rejected() {
    let (_temp, path) = setup_temp("big.sdds");
    let mut bytes = b"SDDS1\n!# big-endian\n&column name=v, type=long, &end\n&data mode=binary, &end\n".to_vec();
    bytes.extend_from_slice(&1i32.to_be_bytes());
    bytes.extend_from_slice(&7i32.to_be_bytes());
    // torn second page
    bytes.extend_from_slice(&[0, 0]);
    fs::write(&path, &bytes).unwrap();

    let ctx = context();
    assert!(matches!(ctx.initialize_append(&path), Err(SddsError::Protocol(_))));
    assert!(matches!(
        ctx.initialize_append_to_page(&path, 1),
        Err(SddsError::Protocol(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), bytes);
    assert_eq!(ctx.registry().in_use(), 0);
}

#[test]
fn test_appended_layout_is_frozen() {
    let (_temp, path) = setup_temp("frozen.sdds");
    let ctx = context();
    write_pages(&ctx, &path, DataMode::Binary, 1, 1);

    let mut writer = ctx.initialize_append(&path).unwrap();
    assert!(matches!(
        writer.define_simple_column("w", DataType::Double),
        Err(SddsError::Protocol(_))
    ));
    assert!(matches!(writer.set_column_major_order(), Err(SddsError::Protocol(_))));
    writer.terminate().unwrap();
}
