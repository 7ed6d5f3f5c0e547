//! Response decoding through the public API.

use hp5316::measurement::{decode, DecodeError, Unit};

#[test]
fn test_frequency_reading() {
    let m = decode("F00001000.000000000").unwrap();
    assert_eq!(m.unit, Unit::Hertz);
    assert_eq!(m.value, 1000.0);
    assert!(!m.overflow);
    assert_eq!(m.raw, "F00001000.000000000");
}

#[test]
fn test_overflow_reading() {
    let m = decode("O00000000.000000000").unwrap();
    assert!(m.overflow);
    assert_eq!(m.unit, Unit::None);
}

#[test]
fn test_error_and_blank_tags() {
    assert_eq!(decode("X00000000.000000000").unwrap().unit, Unit::Error);
    assert_eq!(decode(" 00000042.000000000").unwrap().unit, Unit::None);
    assert_eq!(decode("Q00000042.000000000").unwrap().unit, Unit::None);
}

#[test]
fn test_value_field_is_nineteen_chars() {
    // Anything past the value field is ignored
    let m = decode("T0.00000123400000000EXTRA\r\n").unwrap();
    assert_eq!(m.unit, Unit::Seconds);
    assert!((m.value - 1.234e-6).abs() < 1e-15);
}

#[test]
fn test_malformed_responses() {
    assert!(matches!(decode(""), Err(DecodeError::Empty)));
    assert!(matches!(decode("\r\n"), Err(DecodeError::Empty)));
    assert!(matches!(
        decode("Fnot-a-number"),
        Err(DecodeError::InvalidValue { .. })
    ));
}
