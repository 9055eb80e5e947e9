//! Layout definition tests

use sdds::layout::namelist;
use sdds::{
    ArrayDefinition, CheckStatus, ColumnDefinition, DataType, Definition, Layout,
    ParameterDefinition, SddsError,
};

fn beam_layout() -> Layout {
    let mut layout = Layout::new();
    layout
        .define_parameter(ParameterDefinition::new("energy", DataType::Double).with_units("MeV"))
        .unwrap();
    layout
        .define_array(ArrayDefinition::new("matrix", DataType::Double, 2).with_group_name("optics"))
        .unwrap();
    layout
        .define_column(ColumnDefinition::new("s", DataType::Double).with_units("m"))
        .unwrap();
    layout.define_simple_column("name", DataType::String).unwrap();
    layout
}

#[test]
fn test_ordinals_follow_definition_order() {
    let layout = beam_layout();
    assert_eq!(layout.column_index("s"), Some(0));
    assert_eq!(layout.column_index("name"), Some(1));
    assert_eq!(layout.column_at(1).unwrap().name, "name");
    assert_eq!(layout.column_names(), vec!["s", "name"]);
    assert_eq!(layout.array("matrix").unwrap().dimensions, 2);
    assert_eq!(layout.parameter_count(), 1);
    assert!(layout.column_index("x").is_none());
}

#[test]
fn test_duplicates_per_kind() {
    let mut layout = beam_layout();
    assert!(matches!(
        layout.define_simple_parameter("energy", DataType::Long),
        Err(SddsError::DuplicateDefinition { kind: "parameter", .. })
    ));
    assert!(matches!(
        layout.define(Definition::from(ColumnDefinition::new("s", DataType::Float))),
        Err(SddsError::DuplicateDefinition { kind: "column", .. })
    ));
    layout.define_simple_array("energy", DataType::Long, 1).unwrap();
    assert_eq!(layout.array_count(), 2);
}

#[test]
fn test_invalid_definitions_rejected() {
    let mut layout = Layout::new();
    assert!(layout
        .define_parameter(ParameterDefinition::new("n", DataType::Short).with_fixed_value("many"))
        .is_err());
    assert!(layout
        .define_column(ColumnDefinition::new("x", DataType::Double).with_format_string("%d"))
        .is_err());
    assert!(layout.is_empty());
}

#[test]
fn test_checks() {
    let layout = beam_layout();
    assert_eq!(layout.check_column("s", Some("m"), Some(DataType::Double)), CheckStatus::Okay);
    assert_eq!(layout.check_column("s", None, None), CheckStatus::Okay);
    assert_eq!(layout.check_column("s", Some("mm"), None), CheckStatus::WrongUnits);
    assert_eq!(layout.check_column("s", None, Some(DataType::Float)), CheckStatus::WrongType);
    assert_eq!(layout.check_parameter("power", None, None), CheckStatus::NonExistent);
    assert_eq!(layout.check_array("matrix", None, Some(DataType::Double)), CheckStatus::Okay);
}

#[test]
fn test_transfer_definitions() {
    let source = beam_layout();
    let mut target = Layout::new();
    target.transfer_column_definition(&source, "s", None).unwrap();
    target.transfer_column_definition(&source, "s", Some("s2")).unwrap();
    target.transfer_parameter_definition(&source, "energy", None).unwrap();
    target.transfer_array_definition(&source, "matrix", Some("m")).unwrap();

    assert_eq!(target.column("s2").unwrap().units, "m");
    assert_eq!(target.array("m").unwrap().group_name, "optics");
    assert!(matches!(
        target.transfer_column_definition(&source, "missing", None),
        Err(SddsError::UnknownName { kind: "column", .. })
    ));
}

#[test]
fn test_tuple_form() {
    let def = ParameterDefinition::new("p", DataType::Long)
        .with_symbol("P")
        .with_fixed_value("3");
    let tuple = def.to_tuple();
    assert_eq!(tuple.4, DataType::Long.code());
    assert_eq!(ParameterDefinition::from_tuple("p", tuple).unwrap(), def);

    let column = ColumnDefinition::new("c", DataType::UShort).with_units("V");
    assert_eq!(ColumnDefinition::from_tuple("c", column.to_tuple()).unwrap(), column);

    let array = ArrayDefinition::new("a", DataType::Character, 3);
    assert_eq!(ArrayDefinition::from_tuple("a", array.to_tuple()).unwrap(), array);

    let bad = (String::new(), String::new(), String::new(), String::new(), 42, 0);
    assert!(ColumnDefinition::from_tuple("c", bad).is_err());
}

#[test]
fn test_namelist_lines() {
    let line = namelist::Namelist::new("column")
        .field("name", "x")
        .optional("units", "")
        .optional("description", "a, b")
        .field("type", "double")
        .to_line();
    assert_eq!(line, "&column name=x, description=\"a, b\", type=double, &end\n");

    let parsed = namelist::parse(&line).unwrap();
    assert_eq!(parsed.get("description"), Some("a, b"));
    assert_eq!(parsed.get("units"), None);
    assert!(namelist::is_complete("&column name=\"&end\", &end"));
    assert!(!namelist::is_complete("&column name=\"&end\","));
}
