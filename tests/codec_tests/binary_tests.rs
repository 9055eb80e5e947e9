//! Binary dataset tests

use std::fs;
use std::io::Cursor;
use std::path::Path;

use sdds::{
    ArrayDefinition, Config, DataMode, DataType, Description, Page, PageRead, SddsContext,
    SddsReader, Value, ValueBuffer,
};

use super::{context, setup_temp, write_scenario};

const SCENARIO_HEADER: &str = "SDDS1\n\
                               !# little-endian\n\
                               &parameter name=count, type=short, &end\n\
                               &column name=x, type=double, &end\n\
                               &data mode=binary, &end\n";

/// Every kind in one layout: parameters, a 2-D array and columns
fn write_every_kind(ctx: &SddsContext, path: &Path, mode: DataMode) {
    let mut writer = ctx
        .initialize_output(path, mode, Description::new(Some("kinds"), Some("all of them")))
        .unwrap();
    writer.define_simple_parameter("ld", DataType::LongDouble).unwrap();
    writer.define_simple_parameter("u64", DataType::ULong64).unwrap();
    writer.define_simple_parameter("label", DataType::String).unwrap();
    writer.define_simple_parameter("c", DataType::Character).unwrap();
    writer
        .define_array(ArrayDefinition::new("m", DataType::Float, 2))
        .unwrap();
    writer.define_simple_column("d", DataType::Double).unwrap();
    writer.define_simple_column("i", DataType::Long64).unwrap();
    writer.define_simple_column("u", DataType::UShort).unwrap();
    writer.define_simple_column("s", DataType::String).unwrap();
    writer.write_layout().unwrap();

    for page in 0..3u64 {
        writer.start_page(4).unwrap();
        writer.set_parameter("ld", Value::LongDouble(0.1 * page as f64)).unwrap();
        writer.set_parameter("u64", u64::MAX - page).unwrap();
        writer.set_parameter("label", format!("page {}", page)).unwrap();
        writer.set_parameter("c", Value::Character(b'A' + page as u8)).unwrap();
        writer
            .set_array("m", vec![0.5f32, -1.25, 3.0, 4.75], &[2, 2])
            .unwrap();
        writer.set_column("d", vec![1.0e-9, -2.5, 3.75, 1.0e300]).unwrap();
        writer.set_column("i", vec![i64::MIN, -1, 0, i64::MAX]).unwrap();
        writer.set_column("u", vec![0u16, 1, 2, u16::MAX]).unwrap();
        writer.set_column("s", vec!["a", "b c", "", "\"q\""]).unwrap();
        writer.write_page().unwrap();
    }
    writer.terminate().unwrap();
}

fn read_all(ctx: &SddsContext, path: &Path) -> Vec<Page> {
    let mut reader = ctx.initialize_input(path).unwrap();
    let mut pages = Vec::new();
    while let PageRead::Page(_) = reader.read_page().unwrap() {
        pages.push(reader.take_page().unwrap());
    }
    pages
}

#[test]
fn test_scenario_bytes() {
    let (_temp, path) = setup_temp("scenario.sdds");
    write_scenario(&context(), &path, DataMode::Binary);

    let bytes = fs::read(&path).unwrap();
    let (header, data) = bytes.split_at(SCENARIO_HEADER.len());
    assert_eq!(header, SCENARIO_HEADER.as_bytes());

    let mut expected = Vec::new();
    expected.extend_from_slice(&3i32.to_le_bytes());
    expected.extend_from_slice(&7i16.to_le_bytes());
    for x in [1.5f64, 2.5, 3.5] {
        expected.extend_from_slice(&x.to_le_bytes());
    }
    assert_eq!(data, &expected[..]);
}

#[test]
fn test_modes_read_back_identically() {
    let (temp, ascii_path) = setup_temp("kinds.ascii.sdds");
    let binary_path = temp.path().join("kinds.binary.sdds");
    let ctx = context();

    write_every_kind(&ctx, &ascii_path, DataMode::Ascii);
    write_every_kind(&ctx, &binary_path, DataMode::Binary);

    let from_ascii = read_all(&ctx, &ascii_path);
    let from_binary = read_all(&ctx, &binary_path);
    assert_eq!(from_ascii.len(), 3);
    assert_eq!(from_ascii, from_binary);

    assert_eq!(from_binary[2].parameters[2], Value::from("page 2"));
    assert_eq!(from_binary[1].parameters[3], Value::Character(b'B'));
    assert_eq!(
        from_binary[0].columns[3],
        ValueBuffer::from(vec!["a", "b c", "", "\"q\""])
    );

    let reader = ctx.initialize_input(&binary_path).unwrap();
    assert_eq!(reader.version(), 5);
    assert_eq!(reader.description().contents.as_deref(), Some("all of them"));
}

#[test]
fn test_column_major_pages() {
    let (_temp, path) = setup_temp("columns.sdds");
    let ctx = SddsContext::new(Config::builder().column_major(true).build());

    let mut writer = ctx
        .initialize_output(&path, DataMode::Binary, Description::default())
        .unwrap();
    writer.define_simple_column("a", DataType::Short).unwrap();
    writer.define_simple_column("b", DataType::Short).unwrap();
    writer.write_layout().unwrap();
    writer.start_page(3).unwrap();
    writer.set_column("a", vec![1i16, 2, 3]).unwrap();
    writer.set_column("b", vec![10i16, 20, 30]).unwrap();
    writer.write_page().unwrap();
    writer.terminate().unwrap();

    let bytes = fs::read(&path).unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("SDDS3\n"));
    assert!(text.contains("&data mode=binary, column_major_order=1, &end\n"));

    let shorts: Vec<u8> = [1i16, 2, 3, 10, 20, 30]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    assert!(bytes.ends_with(&shorts));

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert!(reader.is_column_major());
    reader.read_page().unwrap();
    assert_eq!(reader.column("b").unwrap(), &ValueBuffer::Short(vec![10, 20, 30]));
}

#[test]
fn test_column_major_ignored_for_ascii() {
    let (_temp, path) = setup_temp("ascii_columns.sdds");
    let ctx = SddsContext::new(Config::builder().column_major(true).build());

    let mut writer = ctx
        .initialize_output(&path, DataMode::Ascii, Description::default())
        .unwrap();
    writer.define_simple_column("a", DataType::Short).unwrap();
    writer.terminate().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("SDDS1\n"));
    assert!(!text.contains("column_major_order"));
}

#[test]
fn test_big_endian_stream() {
    let mut bytes = b"SDDS1\n\
                      !# big-endian\n\
                      &parameter name=p, type=long, &end\n\
                      &column name=v, type=double, &end\n\
                      &data mode=binary, &end\n"
        .to_vec();
    bytes.extend_from_slice(&2i32.to_be_bytes());
    bytes.extend_from_slice(&(-9i32).to_be_bytes());
    bytes.extend_from_slice(&0.25f64.to_be_bytes());
    bytes.extend_from_slice(&(-4.0f64).to_be_bytes());

    let mut reader = SddsReader::from_reader(Cursor::new(bytes), Config::default()).unwrap();
    assert_eq!(reader.byte_order(), sdds::ByteOrder::Big);
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert_eq!(reader.parameter("p").unwrap(), &Value::Long(-9));
    assert_eq!(reader.column("v").unwrap(), &ValueBuffer::Double(vec![0.25, -4.0]));
    assert_eq!(reader.read_page().unwrap(), PageRead::EndOfStream);
}

#[test]
fn test_escaped_row_count() {
    let mut bytes = b"SDDS1\n\
                      !# little-endian\n\
                      &column name=n, type=long, &end\n\
                      &data mode=binary, &end\n"
        .to_vec();
    bytes.extend_from_slice(&i32::MIN.to_le_bytes());
    bytes.extend_from_slice(&2i64.to_le_bytes());
    bytes.extend_from_slice(&5i32.to_le_bytes());
    bytes.extend_from_slice(&6i32.to_le_bytes());

    let mut reader = SddsReader::from_reader(Cursor::new(bytes), Config::default()).unwrap();
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert_eq!(reader.column("n").unwrap(), &ValueBuffer::Long(vec![5, 6]));
}

#[test]
fn test_oversized_array_dimensions_mark_stream_corrupt() {
    let mut bytes = b"SDDS1\n\
                      !# little-endian\n\
                      &array name=cube, type=double, dimensions=3, &end\n\
                      &data mode=binary, &end\n"
        .to_vec();
    bytes.extend_from_slice(&0i32.to_le_bytes());
    for _ in 0..3 {
        bytes.extend_from_slice(&1i32.to_le_bytes());
    }
    bytes.extend_from_slice(&2.5f64.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    for _ in 0..3 {
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());
    }
    bytes.extend_from_slice(&1.0f64.to_le_bytes());

    let mut reader = SddsReader::from_reader(Cursor::new(bytes), Config::default()).unwrap();
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert_eq!(reader.read_page().unwrap(), PageRead::Corrupt);
}

#[test]
fn test_huge_string_length_is_torn_page() {
    let mut bytes = b"SDDS1\n\
                      !# little-endian\n\
                      &column name=s, type=string, &end\n\
                      &data mode=binary, &end\n"
        .to_vec();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.extend_from_slice(b"ok");
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&i32::MAX.to_le_bytes());
    bytes.extend_from_slice(b"short");

    let mut reader = SddsReader::from_reader(Cursor::new(bytes), Config::default()).unwrap();
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert_eq!(reader.column("s").unwrap(), &ValueBuffer::from(vec!["ok"]));
    assert_eq!(reader.read_page().unwrap(), PageRead::Corrupt);
}
