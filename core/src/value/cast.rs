// mise/src/value/cast.rs

//! Coercion rules between payload kinds.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use std::sync::Arc;

use super::kind::{Payload, ValueKind};
use crate::error::CastError;

/// Options accepted by `InputType::cast`.
///
/// `fallback` is returned (as-is) whenever the conversion fails. `min`/`max`
/// clamp numeric results and are ignored for every other target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastOptions {
  pub fallback: Option<Payload>,
  pub min: Option<f64>,
  pub max: Option<f64>,
}

impl CastOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fallback(mut self, value: impl Into<Payload>) -> Self {
    self.fallback = Some(value.into());
    self
  }

  pub fn min(mut self, min: f64) -> Self {
    self.min = Some(min);
    self
  }

  pub fn max(mut self, max: f64) -> Self {
    self.max = Some(max);
    self
  }
}

/// Converts `payload` to `target`, applying the fallback rule on failure.
pub(crate) fn cast_payload(payload: &Payload, target: ValueKind, options: &CastOptions) -> Result<Payload, CastError> {
  match convert(payload, target, options) {
    Ok(converted) => Ok(converted),
    Err(err) => match &options.fallback {
      Some(fallback) => {
        tracing::trace!(%target, actual = %payload.kind(), "cast failed, using fallback");
        Ok(fallback.clone())
      }
      None => Err(err),
    },
  }
}

fn convert(payload: &Payload, target: ValueKind, options: &CastOptions) -> Result<Payload, CastError> {
  let fail = || CastError::new(target, payload.kind());

  match target {
    ValueKind::String => Ok(Payload::String(payload.to_string())),

    ValueKind::Array => match payload {
      Payload::Array(items) => Ok(Payload::Array(items.clone())),
      Payload::String(text) => match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Ok(Payload::Array(items)),
        Ok(_) => Err(fail().with_detail("JSON is not an array")),
        Err(e) => Err(fail().with_detail(e.to_string())),
      },
      _ => Err(fail()),
    },

    ValueKind::Object => match payload {
      Payload::Object(map) => Ok(Payload::Object(map.clone())),
      Payload::String(text) => match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(Payload::Object(map)),
        Ok(_) => Err(fail().with_detail("JSON is not an object")),
        Err(e) => Err(fail().with_detail(e.to_string())),
      },
      _ => Err(fail()),
    },

    ValueKind::ByteArray => match payload {
      Payload::ByteArray(bytes) => Ok(Payload::ByteArray(bytes.clone())),
      Payload::ArrayBuffer(buf) => Ok(Payload::ByteArray(buf.to_vec())),
      Payload::String(text) => Ok(Payload::ByteArray(text.as_bytes().to_vec())),
      _ => Err(fail()),
    },

    ValueKind::ArrayBuffer => match payload {
      Payload::ArrayBuffer(buf) => Ok(Payload::ArrayBuffer(Arc::clone(buf))),
      Payload::ByteArray(bytes) => Ok(Payload::ArrayBuffer(Arc::from(bytes.as_slice()))),
      Payload::String(text) => Ok(Payload::ArrayBuffer(Arc::from(text.as_bytes()))),
      _ => Err(fail()),
    },

    ValueKind::Base64 | ValueKind::Hex => {
      let bytes: &[u8] = match payload {
        Payload::String(text) => text.as_bytes(),
        other => other.bytes().ok_or_else(fail)?,
      };
      let encoded = if target == ValueKind::Base64 {
        STANDARD.encode(bytes)
      } else {
        hex::encode(bytes)
      };
      Ok(Payload::String(encoded))
    }

    ValueKind::Boolean => {
      if let Payload::Boolean(b) = payload {
        return Ok(Payload::Boolean(*b));
      }
      match payload.to_string().trim().to_lowercase().as_str() {
        "true" | "1" => Ok(Payload::Boolean(true)),
        "false" | "0" | "" => Ok(Payload::Boolean(false)),
        _ => Err(fail().with_detail("ambiguous boolean")),
      }
    }

    ValueKind::Number => {
      let parsed = match payload {
        Payload::Number(n) => *n,
        other => other
          .to_string()
          .trim()
          .parse::<f64>()
          .map_err(|e| fail().with_detail(e.to_string()))?,
      };
      if !parsed.is_finite() {
        return Err(fail().with_detail("not a finite number"));
      }
      let mut n = parsed;
      if let Some(min) = options.min {
        n = n.max(min);
      }
      if let Some(max) = options.max {
        n = n.min(max);
      }
      Ok(Payload::Number(n))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_string_is_not_a_number() {
    let err = cast_payload(&Payload::from(""), ValueKind::Number, &CastOptions::new()).unwrap_err();
    assert_eq!(err.target, ValueKind::Number);
    assert_eq!(err.actual, ValueKind::String);
  }

  #[test]
  fn number_parse_trims_whitespace() {
    let n = cast_payload(&Payload::from("  42 "), ValueKind::Number, &CastOptions::new()).unwrap();
    assert_eq!(n, Payload::Number(42.0));
  }

  #[test]
  fn numbers_cannot_be_hex_encoded() {
    assert!(cast_payload(&Payload::Number(1.0), ValueKind::Hex, &CastOptions::new()).is_err());
  }
}
