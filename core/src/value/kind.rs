// mise/src/value/kind.rs

//! Payload representation carried by an `InputType` and the kinds it can be
//! classified as or cast to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Kinds a payload can be classified as, plus the string encodings
/// (`Base64`, `Hex`) that are only reachable as cast targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
  String,
  Number,
  Boolean,
  #[serde(rename = "bytearray")]
  ByteArray,
  #[serde(rename = "arraybuffer")]
  ArrayBuffer,
  Array,
  Object,
  Base64,
  Hex,
}

impl ValueKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ValueKind::String => "string",
      ValueKind::Number => "number",
      ValueKind::Boolean => "boolean",
      ValueKind::ByteArray => "bytearray",
      ValueKind::ArrayBuffer => "arraybuffer",
      ValueKind::Array => "array",
      ValueKind::Object => "object",
      ValueKind::Base64 => "base64",
      ValueKind::Hex => "hex",
    }
  }
}

impl fmt::Display for ValueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The data wrapped by an `InputType`.
///
/// `ByteArray` is an owned, growable byte sequence; `ArrayBuffer` is a shared,
/// immutable buffer handed between steps without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  String(String),
  Number(f64),
  Boolean(bool),
  ByteArray(Vec<u8>),
  ArrayBuffer(Arc<[u8]>),
  Array(Vec<Value>),
  Object(Map<String, Value>),
}

impl Payload {
  /// Kind of the payload as stored. Never returns `Base64` or `Hex`.
  pub fn kind(&self) -> ValueKind {
    match self {
      Payload::String(_) => ValueKind::String,
      Payload::Number(_) => ValueKind::Number,
      Payload::Boolean(_) => ValueKind::Boolean,
      Payload::ByteArray(_) => ValueKind::ByteArray,
      Payload::ArrayBuffer(_) => ValueKind::ArrayBuffer,
      Payload::Array(_) => ValueKind::Array,
      Payload::Object(_) => ValueKind::Object,
    }
  }

  /// Maps a JSON value onto the closest payload. `null` becomes an empty string.
  pub fn from_json(value: Value) -> Self {
    match value {
      Value::Null => Payload::String(String::new()),
      Value::Bool(b) => Payload::Boolean(b),
      Value::Number(n) => Payload::Number(n.as_f64().unwrap_or(f64::NAN)),
      Value::String(s) => Payload::String(s),
      Value::Array(items) => Payload::Array(items),
      Value::Object(map) => Payload::Object(map),
    }
  }

  /// Raw bytes for the byte-like payloads.
  pub(crate) fn bytes(&self) -> Option<&[u8]> {
    match self {
      Payload::ByteArray(bytes) => Some(bytes),
      Payload::ArrayBuffer(buf) => Some(buf),
      _ => None,
    }
  }
}

pub(crate) fn format_number(n: f64) -> String {
  if n.is_nan() {
    "NaN".to_string()
  } else if n.is_infinite() {
    if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
  } else if n == 0.0 {
    // -0 prints as 0
    "0".to_string()
  } else {
    n.to_string()
  }
}

/// The string projection of a payload. Never fails.
impl fmt::Display for Payload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Payload::String(s) => f.write_str(s),
      Payload::Number(n) => f.write_str(&format_number(*n)),
      Payload::Boolean(b) => write!(f, "{b}"),
      Payload::ByteArray(_) | Payload::ArrayBuffer(_) => {
        let bytes = self.bytes().unwrap_or_default();
        match std::str::from_utf8(bytes) {
          Ok(text) => f.write_str(text),
          Err(_) => f.write_str(&hex::encode(bytes)),
        }
      }
      Payload::Array(items) => {
        let json = serde_json::to_string(items).map_err(|_| fmt::Error)?;
        f.write_str(&json)
      }
      Payload::Object(map) => {
        let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
        f.write_str(&json)
      }
    }
  }
}

impl From<String> for Payload {
  fn from(s: String) -> Self {
    Payload::String(s)
  }
}

impl From<&str> for Payload {
  fn from(s: &str) -> Self {
    Payload::String(s.to_string())
  }
}

impl From<f64> for Payload {
  fn from(n: f64) -> Self {
    Payload::Number(n)
  }
}

impl From<i64> for Payload {
  fn from(n: i64) -> Self {
    Payload::Number(n as f64)
  }
}

impl From<bool> for Payload {
  fn from(b: bool) -> Self {
    Payload::Boolean(b)
  }
}

impl From<Vec<u8>> for Payload {
  fn from(bytes: Vec<u8>) -> Self {
    Payload::ByteArray(bytes)
  }
}

impl From<Arc<[u8]>> for Payload {
  fn from(buf: Arc<[u8]>) -> Self {
    Payload::ArrayBuffer(buf)
  }
}

impl From<Value> for Payload {
  fn from(value: Value) -> Self {
    Payload::from_json(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn whole_numbers_project_without_fraction() {
    assert_eq!(Payload::Number(10.0).to_string(), "10");
    assert_eq!(Payload::Number(-0.0).to_string(), "0");
    assert_eq!(Payload::Number(2.5).to_string(), "2.5");
    assert_eq!(Payload::Number(f64::INFINITY).to_string(), "Infinity");
  }

  #[test]
  fn invalid_utf8_projects_as_hex() {
    assert_eq!(Payload::ByteArray(vec![0xff, 0x00, 0x10]).to_string(), "ff0010");
    assert_eq!(Payload::ByteArray(b"hi".to_vec()).to_string(), "hi");
  }

  #[test]
  fn containers_project_as_json() {
    let payload = Payload::from_json(serde_json::json!({"a": [1, 2]}));
    assert_eq!(payload.to_string(), r#"{"a":[1,2]}"#);
    assert_eq!(Payload::from_json(serde_json::json!([true])).to_string(), "[true]");
  }
}
