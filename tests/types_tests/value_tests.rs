//! Value conversion and single-value encoding

use sdds::types::{decode, encode};
use sdds::{DataMode, DataType, SddsError, Value};

#[test]
fn test_integer_narrowing_checked() {
    assert_eq!(Value::Long(300).coerce(DataType::Short).unwrap(), Value::Short(300));
    assert!(matches!(
        Value::Long(-1).coerce(DataType::UShort),
        Err(SddsError::TypeMismatch { .. })
    ));
    assert!(matches!(
        Value::ULong64(u64::MAX).coerce(DataType::Long64),
        Err(SddsError::TypeMismatch { .. })
    ));
}

#[test]
fn test_float_to_integer_only_when_integral() {
    assert_eq!(Value::Double(4.0).coerce(DataType::Long).unwrap(), Value::Long(4));
    assert!(Value::Double(4.5).coerce(DataType::Long).is_err());
    assert_eq!(Value::Short(3).coerce(DataType::Float).unwrap(), Value::Float(3.0));
}

#[test]
fn test_string_conversions() {
    assert_eq!(Value::from("42").coerce(DataType::ULong).unwrap(), Value::ULong(42));
    assert_eq!(Value::from("x").coerce(DataType::Character).unwrap(), Value::Character(b'x'));
    assert_eq!(Value::Double(1.5).coerce(DataType::String).unwrap(), Value::from("1.5"));
    assert!(Value::from("4x").coerce(DataType::Double).is_err());
    assert!(Value::Character(b'a').coerce(DataType::Long).is_err());
    assert_eq!(Value::character('é').unwrap(), Value::Character(0xe9));
    assert!(Value::character('€').is_err());
}

#[test]
fn test_single_value_binary() {
    let bytes = encode(&Value::Long(-2), DataType::Long, DataMode::Binary).unwrap();
    assert_eq!(bytes, (-2i32).to_le_bytes());
    assert_eq!(decode(&bytes, DataType::Long, DataMode::Binary).unwrap(), Value::Long(-2));

    let bytes = encode(&Value::from("abc"), DataType::String, DataMode::Binary).unwrap();
    assert_eq!(&bytes[..4], &3i32.to_le_bytes());
    assert_eq!(&bytes[4..], b"abc");

    let bytes = encode(&Value::LongDouble(-0.75), DataType::LongDouble, DataMode::Binary).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(
        decode(&bytes, DataType::LongDouble, DataMode::Binary).unwrap(),
        Value::LongDouble(-0.75)
    );
}

#[test]
fn test_single_value_ascii() {
    let bytes = encode(&Value::from("a b"), DataType::String, DataMode::Ascii).unwrap();
    assert_eq!(bytes, b"\"a b\"");
    assert_eq!(
        decode(&bytes, DataType::String, DataMode::Ascii).unwrap(),
        Value::from("a b")
    );

    let bytes = encode(&Value::Short(7), DataType::Double, DataMode::Ascii).unwrap();
    assert_eq!(decode(&bytes, DataType::Double, DataMode::Ascii).unwrap(), Value::Double(7.0));
}

#[test]
fn test_truncated_binary_value() {
    assert!(decode(&[1, 2], DataType::Long, DataMode::Binary).is_err());
}
