// tests/value_cast_tests.rs
mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use common::*;
use mise::{CastOptions, InputType, MiseError, Payload, ValueKind};

#[test]
fn test_bytes_survive_base64_round_trip() {
  setup_tracing();
  let original: Vec<u8> = (0..=255u8).collect();
  let encoded = InputType::new(original.clone())
    .cast(ValueKind::Base64, &CastOptions::new())
    .unwrap();

  let decoded = STANDARD.decode(encoded.to_string()).unwrap();
  let restored = InputType::new(decoded)
    .cast(ValueKind::ByteArray, &CastOptions::new())
    .unwrap();
  assert_eq!(restored.payload(), &Payload::ByteArray(original));
}

#[test]
fn test_utf8_string_survives_byte_round_trip() {
  setup_tracing();
  let text = "grüße, 世界 🍲";
  let bytes = InputType::new(text).cast(ValueKind::ByteArray, &CastOptions::new()).unwrap();
  let back = bytes.cast(ValueKind::String, &CastOptions::new()).unwrap();
  assert_eq!(back.payload(), &Payload::String(text.to_string()));

  let buffer = InputType::new(text).cast(ValueKind::ArrayBuffer, &CastOptions::new()).unwrap();
  assert_eq!(buffer.type_of().unwrap(), ValueKind::ArrayBuffer);
  assert_eq!(buffer.to_string(), text);
}

#[test]
fn test_fallback_is_returned_exactly_on_failure() {
  setup_tracing();
  let fallback = CastOptions::new().fallback(-1.0);

  assert_eq!(InputType::new("not a number").to_number(&fallback).unwrap(), -1.0);
  assert_eq!(InputType::new("12").to_number(&fallback).unwrap(), 12.0);

  let kept = InputType::new(true).cast(ValueKind::Array, &CastOptions::new().fallback("[]")).unwrap();
  assert_eq!(kept.payload(), &Payload::String("[]".to_string()));
}

#[test]
fn test_failure_names_both_kinds() {
  setup_tracing();
  let err = InputType::new(true).cast(ValueKind::ByteArray, &CastOptions::new()).unwrap_err();
  assert_eq!(err.actual, ValueKind::Boolean);
  assert_eq!(err.target, ValueKind::ByteArray);
  assert!(err.to_string().starts_with("Cannot cast boolean to bytearray"));

  let wrapped: MiseError = err.into();
  assert!(matches!(wrapped, MiseError::Cast(_)));
}

#[test]
fn test_number_casts_clamp_and_reject_non_finite() {
  setup_tracing();
  let clamp = CastOptions::new().min(0.0).max(10.0);
  assert_eq!(InputType::new("42").to_number(&clamp).unwrap(), 10.0);
  assert_eq!(InputType::new(-3.5).to_number(&clamp).unwrap(), 0.0);
  assert!(InputType::new("inf").to_number(&CastOptions::new()).is_err());
  assert!(InputType::new("").to_number(&CastOptions::new()).is_err());
}

#[test]
fn test_boolean_casts() {
  setup_tracing();
  let options = CastOptions::new();
  assert!(InputType::new(" TRUE ").to_boolean(&options).unwrap());
  assert!(InputType::new(1.0).to_boolean(&options).unwrap());
  assert!(!InputType::new("0").to_boolean(&options).unwrap());
  assert!(!InputType::new("").to_boolean(&options).unwrap());
  assert!(InputType::new("maybe").to_boolean(&options).is_err());
}

#[test]
fn test_json_strings_cast_to_containers() {
  setup_tracing();
  let array = InputType::new("[1, 2, 3]").cast(ValueKind::Array, &CastOptions::new()).unwrap();
  assert_eq!(array.type_of().unwrap(), ValueKind::Array);
  assert_eq!(array.to_string(), "[1,2,3]");

  assert!(InputType::new("[1]").cast(ValueKind::Object, &CastOptions::new()).is_err());
  let object = InputType::new(serde_json::json!({"k": "v"}));
  assert_eq!(object.type_of().unwrap(), ValueKind::Object);
}

#[test]
fn test_hex_and_base64_targets_encode_strings() {
  setup_tracing();
  let options = CastOptions::new();
  assert_eq!(InputType::new("hi").cast(ValueKind::Hex, &options).unwrap().to_string(), "6869");
  assert_eq!(InputType::new("hi").cast(ValueKind::Base64, &options).unwrap().to_string(), "aGk=");
}

#[test]
fn test_non_finite_number_has_no_type() {
  setup_tracing();
  let err = InputType::new(f64::NAN).type_of().unwrap_err();
  assert!(matches!(err, MiseError::UnsupportedPayload(_)));
  assert_eq!(InputType::new(f64::NEG_INFINITY).to_string(), "-Infinity");
}

#[test]
fn test_derived_values_keep_metadata_and_leave_source_untouched() {
  setup_tracing();
  let source = InputType::new("5");
  let warned = source.with_warning("careful");
  let cast = warned.cast(ValueKind::Number, &CastOptions::new()).unwrap();

  assert_eq!(source.warning(), None);
  assert_eq!(cast.warning(), Some("careful"));
  assert_eq!(cast.payload(), &Payload::Number(5.0));
  assert_eq!(source.payload(), &Payload::String("5".to_string()));
}
