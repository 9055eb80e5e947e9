//! Page store tests

use sdds::{
    ArrayValue, Config, DataMode, DataType, Description, PageStore, SddsContext, SddsError, Value,
    ValueBuffer,
};
use tempfile::TempDir;

fn store() -> PageStore {
    let mut store = PageStore::new(DataMode::Binary);
    store.set_description(Description::new(Some("store"), None));
    store.define_simple_parameter("turn", DataType::Long).unwrap();
    store.define_simple_array("w", DataType::Double, 1).unwrap();
    store.define_simple_column("x", DataType::Double).unwrap();
    store.define_simple_column("tag", DataType::String).unwrap();
    store
}

fn filled(pages: usize) -> PageStore {
    let mut store = store();
    for page in 1..=pages {
        store.set_parameter_value("turn", page, page as i32).unwrap();
        store
            .set_array_value("w", page, ArrayValue::vector(ValueBuffer::from(vec![page as f64; 2])))
            .unwrap();
        store
            .set_column_page("x", page, vec![0.5 * page as f64, 1.0])
            .unwrap();
        store.set_column_page("tag", page, vec!["a", "b c"]).unwrap();
    }
    store
}

#[test]
fn test_parameter_append_and_overwrite() {
    let mut store = store();
    assert!(matches!(
        store.set_parameter_value("turn", 2, 5i32),
        Err(SddsError::InvalidPage(2))
    ));
    assert!(matches!(
        store.set_parameter_value("turn", 0, 5i32),
        Err(SddsError::InvalidPage(0))
    ));

    store.set_parameter_value("turn", 1, 5i32).unwrap();
    store.set_parameter_value("turn", 2, 6i32).unwrap();
    store.set_parameter_value("turn", 1, 7i16).unwrap();
    assert_eq!(
        store.parameter_values("turn").unwrap(),
        &[Value::Long(7), Value::Long(6)]
    );
    assert_eq!(store.parameter_value("turn", 2).unwrap(), &Value::Long(6));
    assert!(matches!(store.parameter_value("turn", 3), Err(SddsError::InvalidPage(3))));
    assert!(matches!(
        store.parameter_value("spin", 1),
        Err(SddsError::UnknownName { .. })
    ));
}

#[test]
fn test_column_value_append_rules() {
    let mut store = store();
    store.set_column_value("x", 1, 1, 1.5).unwrap();
    store.set_column_value("x", 1, 2, 2.5).unwrap();
    store.set_column_value("x", 1, 1, 0.5).unwrap();
    store.set_column_value("x", 2, 1, 9.0).unwrap();

    assert!(matches!(
        store.set_column_value("x", 1, 4, 0.0),
        Err(SddsError::InvalidRow(4))
    ));
    assert!(matches!(
        store.set_column_value("x", 4, 1, 0.0),
        Err(SddsError::InvalidPage(4))
    ));
    assert!(matches!(
        store.set_column_value("x", 1, 1, "abc"),
        Err(SddsError::TypeMismatch { .. })
    ));

    assert_eq!(store.column_page("x", 1).unwrap(), &ValueBuffer::Double(vec![0.5, 2.5]));
    assert_eq!(store.column_value("x", 2, 1).unwrap(), Value::Double(9.0));
    assert!(matches!(store.column_value("x", 2, 2), Err(SddsError::InvalidRow(2))));
    assert!(matches!(store.column_value("x", 3, 1), Err(SddsError::InvalidPage(3))));
}

#[test]
fn test_rejected_column_value_leaves_no_page() {
    let mut store = store();
    assert!(matches!(
        store.set_column_value("x", 1, 2, 1.0),
        Err(SddsError::InvalidRow(2))
    ));
    assert!(store.column_values("x").unwrap().is_empty());
    assert!(matches!(
        store.set_column_value("x", 1, 1, "abc"),
        Err(SddsError::TypeMismatch { .. })
    ));
    assert!(store.column_values("x").unwrap().is_empty());

    store.set_column_value("x", 1, 1, 4.0).unwrap();
    assert_eq!(store.column_values("x").unwrap(), &[ValueBuffer::Double(vec![4.0])]);
}

#[test]
fn test_page_count_consistency() {
    let mut store = filled(2);
    assert_eq!(store.page_count().unwrap(), 2);
    store.validate().unwrap();

    store.set_parameter_value("turn", 3, 3i32).unwrap();
    assert!(matches!(store.page_count(), Err(SddsError::InconsistentPage(_))));

    let mut rows = filled(1);
    rows.set_column_page("tag", 1, vec!["only one"]).unwrap();
    assert!(matches!(rows.validate(), Err(SddsError::InconsistentPage(_))));

    assert_eq!(PageStore::new(DataMode::Ascii).page_count().unwrap(), 0);
}

#[test]
fn test_bulk_values_converted() {
    let mut store = store();
    store
        .set_parameter_values("turn", vec![Value::Short(1), Value::from("2")])
        .unwrap();
    store
        .set_column_values("x", vec![ValueBuffer::from(vec![1i32, 2]), ValueBuffer::from(vec![3.5])])
        .unwrap();
    assert_eq!(
        store.column_values("x").unwrap(),
        &[ValueBuffer::Double(vec![1.0, 2.0]), ValueBuffer::Double(vec![3.5])]
    );
    assert!(matches!(
        store.set_array_values("w", vec![ArrayValue::new(vec![1, 1], ValueBuffer::from(vec![1.0])).unwrap()]),
        Err(SddsError::InconsistentPage(_))
    ));
    assert!(store.array_values("w").unwrap().is_empty());
}

#[test]
fn test_save_then_load() {
    let temp = TempDir::new().unwrap();
    let ctx = SddsContext::new(Config::default());

    for mode in [DataMode::Ascii, DataMode::Binary] {
        let path = temp.path().join(format!("store.{}", mode.name()));
        let mut store = filled(4);
        store.set_mode(mode);
        store.save(&ctx, &path).unwrap();

        let loaded = PageStore::load(&ctx, &path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.description().text.as_deref(), Some("store"));

        let sparse = PageStore::load_sparse(&ctx, &path, 2, 0).unwrap();
        assert_eq!(sparse.page_count().unwrap(), 2);
        assert_eq!(
            sparse.parameter_values("turn").unwrap(),
            &[Value::Long(1), Value::Long(3)]
        );

        let tail = PageStore::load_last_rows(&ctx, &path, 1).unwrap();
        assert_eq!(tail.column_page("x", 3).unwrap(), &ValueBuffer::Double(vec![1.0]));
        assert_eq!(tail.column_page("tag", 3).unwrap(), &ValueBuffer::from(vec!["b c"]));
    }
    assert_eq!(ctx.registry().in_use(), 0);
}

#[test]
fn test_save_rejects_inconsistent_store() {
    let temp = TempDir::new().unwrap();
    let ctx = SddsContext::new(Config::default());
    let mut store = filled(1);
    store.set_parameter_value("turn", 2, 2i32).unwrap();

    let path = temp.path().join("bad.sdds");
    assert!(matches!(store.save(&ctx, &path), Err(SddsError::InconsistentPage(_))));
    assert!(!path.exists());
}

#[test]
fn test_load_corrupt_dataset_fails() {
    let temp = TempDir::new().unwrap();
    let ctx = SddsContext::new(Config::default());
    let path = temp.path().join("corrupt.sdds");
    filled(2).save(&ctx, &path).unwrap();

    let len = std::fs::metadata(&path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 1).unwrap();

    assert!(matches!(PageStore::load(&ctx, &path), Err(SddsError::Format(_))));
}
