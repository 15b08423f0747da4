// mise/src/value/mod.rs

//! The typed value passed between recipe steps.

pub mod cast;
pub mod kind;
pub mod panel;

pub use cast::CastOptions;
pub use kind::{Payload, ValueKind};
pub use panel::{PanelInstruction, PanelMode, PanelTarget, TextPanel};

use crate::error::{CastError, MiseError, MiseResult};
use std::fmt;

/// An immutable wrapper around one payload, plus an optional non-fatal
/// warning and an optional panel instruction.
///
/// Every transformation returns a new value; the receiver is never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct InputType {
  payload: Payload,
  panel: Option<PanelInstruction>,
  warning: Option<String>,
}

impl InputType {
  pub fn new(payload: impl Into<Payload>) -> Self {
    Self {
      payload: payload.into(),
      panel: None,
      warning: None,
    }
  }

  pub fn payload(&self) -> &Payload {
    &self.payload
  }

  pub fn into_payload(self) -> Payload {
    self.payload
  }

  pub fn warning(&self) -> Option<&str> {
    self.warning.as_deref()
  }

  pub fn panel(&self) -> Option<&PanelInstruction> {
    self.panel.as_ref()
  }

  /// Returns a copy carrying `message` as a warning. The kitchen stops the
  /// recipe at a step whose result carries a warning.
  pub fn with_warning(&self, message: impl Into<String>) -> Self {
    Self {
      warning: Some(message.into()),
      ..self.clone()
    }
  }

  pub fn with_panel(&self, panel: PanelInstruction) -> Self {
    Self {
      panel: Some(panel),
      ..self.clone()
    }
  }

  /// Re-wraps a new payload, keeping the warning and panel instruction.
  pub fn with_payload(&self, payload: impl Into<Payload>) -> Self {
    Self {
      payload: payload.into(),
      ..self.clone()
    }
  }

  /// Classifies the payload. Fails only for a non-finite number, which no
  /// well-formed recipe value should carry.
  pub fn type_of(&self) -> MiseResult<ValueKind> {
    match &self.payload {
      Payload::Number(n) if !n.is_finite() => Err(MiseError::UnsupportedPayload(format!(
        "non-finite number {}",
        self.payload
      ))),
      other => Ok(other.kind()),
    }
  }

  pub fn cast(&self, target: ValueKind, options: &CastOptions) -> Result<InputType, CastError> {
    let payload = cast::cast_payload(&self.payload, target, options)?;
    Ok(self.with_payload(payload))
  }

  pub fn to_number(&self, options: &CastOptions) -> Result<f64, CastError> {
    match cast::cast_payload(&self.payload, ValueKind::Number, options)? {
      Payload::Number(n) => Ok(n),
      other => Err(CastError::new(ValueKind::Number, other.kind())),
    }
  }

  pub fn to_boolean(&self, options: &CastOptions) -> Result<bool, CastError> {
    match cast::cast_payload(&self.payload, ValueKind::Boolean, options)? {
      Payload::Boolean(b) => Ok(b),
      other => Err(CastError::new(ValueKind::Boolean, other.kind())),
    }
  }

  pub fn to_bytes(&self, options: &CastOptions) -> Result<Vec<u8>, CastError> {
    match cast::cast_payload(&self.payload, ValueKind::ByteArray, options)? {
      Payload::ByteArray(bytes) => Ok(bytes),
      other => other
        .bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| CastError::new(ValueKind::ByteArray, other.kind())),
    }
  }
}

impl Default for InputType {
  fn default() -> Self {
    Self::new(String::new())
  }
}

/// String projection of the payload.
impl fmt::Display for InputType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.payload, f)
  }
}

macro_rules! input_type_from {
  ($($ty:ty),* $(,)?) => {
    $(
      impl From<$ty> for InputType {
        fn from(value: $ty) -> Self {
          InputType::new(value)
        }
      }
    )*
  };
}

input_type_from!(Payload, String, &str, f64, i64, bool, Vec<u8>, serde_json::Value);
