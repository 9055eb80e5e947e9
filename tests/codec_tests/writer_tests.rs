//! Writer state machine and value checks

use sdds::{DataMode, DataType, Description, PageRead, SddsError, SddsWriter, Value, ValueBuffer};

use super::{context, setup_temp};

fn writer_with_layout(path: &std::path::Path) -> SddsWriter {
    let mut writer = context()
        .initialize_output(path, DataMode::Binary, Description::default())
        .unwrap();
    writer.define_simple_parameter("n", DataType::Short).unwrap();
    writer.define_simple_array("v", DataType::Double, 1).unwrap();
    writer.define_simple_column("a", DataType::Long).unwrap();
    writer.define_simple_column("b", DataType::String).unwrap();
    writer
}

#[test]
fn test_duplicate_names_rejected() {
    let (_temp, path) = setup_temp("dup.sdds");
    let mut writer = writer_with_layout(&path);

    assert!(matches!(
        writer.define_simple_column("a", DataType::Double),
        Err(SddsError::DuplicateDefinition { kind: "column", .. })
    ));
    // names are unique per kind only
    assert_eq!(writer.define_simple_parameter("a", DataType::Double).unwrap(), 1);
    assert_eq!(writer.layout().column_count(), 2);
}

#[test]
fn test_call_order_enforced() {
    let (_temp, path) = setup_temp("order.sdds");
    let mut writer = writer_with_layout(&path);

    assert!(matches!(writer.start_page(1), Err(SddsError::Protocol(_))));
    assert!(matches!(writer.set_parameter("n", 1i16), Err(SddsError::Protocol(_))));
    assert!(matches!(writer.write_page(), Err(SddsError::Protocol(_))));

    writer.write_layout().unwrap();
    assert!(matches!(writer.write_layout(), Err(SddsError::Protocol(_))));
    assert!(matches!(
        writer.define_simple_column("c", DataType::Short),
        Err(SddsError::Protocol(_))
    ));
    assert!(matches!(writer.set_column_major_order(), Err(SddsError::Protocol(_))));

    writer.terminate().unwrap();
    assert!(matches!(writer.terminate(), Err(SddsError::Protocol(_))));
    assert!(matches!(writer.start_page(1), Err(SddsError::Protocol(_))));
}

#[test]
fn test_unknown_names_and_bad_values() {
    let (_temp, path) = setup_temp("values.sdds");
    let mut writer = writer_with_layout(&path);
    writer.write_layout().unwrap();
    writer.start_page(2).unwrap();

    assert!(matches!(
        writer.set_parameter("missing", 1i16),
        Err(SddsError::UnknownName { kind: "parameter", .. })
    ));
    assert!(matches!(
        writer.set_column("missing", vec![1i32]),
        Err(SddsError::UnknownName { kind: "column", .. })
    ));
    assert!(matches!(
        writer.set_parameter("n", "seven"),
        Err(SddsError::TypeMismatch { .. })
    ));
    assert!(matches!(
        writer.set_parameter("n", 70_000i32),
        Err(SddsError::TypeMismatch { .. })
    ));
    assert!(matches!(
        writer.set_array("v", vec![1.0, 2.0], &[2, 1]),
        Err(SddsError::InconsistentPage(_))
    ));
    assert!(matches!(
        writer.set_array("v", vec![1.0, 2.0], &[3]),
        Err(SddsError::InconsistentPage(_))
    ));

    // numeric strings and narrower integers are accepted
    writer.set_parameter("n", "12").unwrap();
    writer.set_parameter("n", 12i32).unwrap();
    writer.terminate().unwrap();
}

#[test]
fn test_inconsistent_page_not_written() {
    let (_temp, path) = setup_temp("rows.sdds");
    let ctx = context();
    let mut writer = writer_with_layout(&path);
    writer.write_layout().unwrap();
    writer.start_page(3).unwrap();
    writer.set_column("a", vec![1i32, 2, 3]).unwrap();
    writer.set_column("b", vec!["x", "y"]).unwrap();

    assert!(matches!(writer.write_page(), Err(SddsError::InconsistentPage(_))));
    assert_eq!(writer.pages_written(), 0);

    writer.set_column("b", vec!["x", "y", "z"]).unwrap();
    assert_eq!(writer.write_page().unwrap(), 1);
    writer.terminate().unwrap();

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert_eq!(reader.row_count().unwrap(), 3);
    assert_eq!(reader.read_page().unwrap(), PageRead::EndOfStream);
}

#[test]
fn test_row_values_grow_columns() {
    let (_temp, path) = setup_temp("grow.sdds");
    let ctx = context();
    let mut writer = writer_with_layout(&path);
    writer.write_layout().unwrap();
    writer.start_page(0).unwrap();

    writer
        .set_row_values(0, &[("a", Value::Long(1)), ("b", Value::from("first"))])
        .unwrap();
    writer.set_row_values(2, &[("a", Value::Long(3))]).unwrap();
    assert!(matches!(
        writer.set_row_values(3, &[("a", Value::Long(4)), ("zz", Value::Long(0))]),
        Err(SddsError::UnknownName { .. })
    ));
    assert_eq!(writer.page().unwrap().row_count().unwrap(), 3);
    writer.write_page().unwrap();
    writer.terminate().unwrap();

    let mut reader = ctx.initialize_input(&path).unwrap();
    reader.read_page().unwrap();
    assert_eq!(reader.column("a").unwrap(), &ValueBuffer::Long(vec![1, 0, 3]));
    assert_eq!(
        reader.column("b").unwrap(),
        &ValueBuffer::from(vec!["first", "", ""])
    );
}

#[test]
fn test_unwritten_page_discarded_at_terminate() {
    let (_temp, path) = setup_temp("discard.sdds");
    let ctx = context();
    let mut writer = writer_with_layout(&path);
    writer.write_layout().unwrap();
    writer.start_page(1).unwrap();
    writer.set_column("a", vec![5i32]).unwrap();
    writer.set_column("b", vec!["kept"]).unwrap();
    writer.write_page().unwrap();
    writer.start_page(1).unwrap();
    writer.set_column("a", vec![6i32]).unwrap();
    writer.terminate().unwrap();

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert_eq!(reader.read_page().unwrap(), PageRead::Page(1));
    assert_eq!(reader.read_page().unwrap(), PageRead::EndOfStream);
}

#[test]
fn test_header_only_dataset() {
    let (_temp, path) = setup_temp("empty.sdds");
    let ctx = context();
    let mut writer = writer_with_layout(&path);
    writer.terminate().unwrap();

    let mut reader = ctx.initialize_input(&path).unwrap();
    assert_eq!(reader.layout().column_count(), 2);
    assert!(matches!(reader.read_page(), Err(SddsError::Format(_))));
}
