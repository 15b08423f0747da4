// mise/src/spice.rs

//! Spices are the declared parameters of an ingredient. This module holds the
//! declarations plus the helpers that sanitize raw values against them and
//! work out which spices are currently visible.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{event, Level};

use crate::ingredient::Ingredient;
use crate::value::{CastOptions, InputType, Payload};

/// A raw or validated spice value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpiceValue {
  Boolean(bool),
  Number(f64),
  String(String),
}

impl SpiceValue {
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      SpiceValue::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      SpiceValue::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      SpiceValue::String(s) => Some(s),
      _ => None,
    }
  }

  fn to_input(&self) -> InputType {
    InputType::new(Payload::from(self.clone()))
  }
}

impl fmt::Display for SpiceValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&Payload::from(self.clone()), f)
  }
}

impl From<SpiceValue> for Payload {
  fn from(value: SpiceValue) -> Self {
    match value {
      SpiceValue::Boolean(b) => Payload::Boolean(b),
      SpiceValue::Number(n) => Payload::Number(n),
      SpiceValue::String(s) => Payload::String(s),
    }
  }
}

impl From<bool> for SpiceValue {
  fn from(b: bool) -> Self {
    SpiceValue::Boolean(b)
  }
}

impl From<f64> for SpiceValue {
  fn from(n: f64) -> Self {
    SpiceValue::Number(n)
  }
}

impl From<i64> for SpiceValue {
  fn from(n: i64) -> Self {
    SpiceValue::Number(n as f64)
  }
}

impl From<&str> for SpiceValue {
  fn from(s: &str) -> Self {
    SpiceValue::String(s.to_string())
  }
}

impl From<String> for SpiceValue {
  fn from(s: String) -> Self {
    SpiceValue::String(s)
  }
}

/// Spice values of one recipe step, keyed by spice id.
pub type Spices = BTreeMap<String, SpiceValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
  pub label: String,
  pub value: SpiceValue,
}

impl SelectOption {
  pub fn new(label: impl Into<String>, value: impl Into<SpiceValue>) -> Self {
    Self {
      label: label.into(),
      value: value.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpiceKind {
  Boolean,
  Number {
    min: Option<f64>,
    max: Option<f64>,
    step: Option<f64>,
  },
  String,
  /// Multi-line string.
  Text,
  Select {
    options: Vec<SelectOption>,
  },
  /// A control type this engine does not know, e.g. one introduced by an
  /// extension. Values are passed through untouched.
  Custom {
    control: String,
  },
}

/// Visibility rule: the spice is shown only while `spice_id` is visible and
/// holds one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiceDependency {
  pub spice_id: String,
  pub values: Vec<SpiceValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spice {
  pub id: String,
  pub label: String,
  pub description: Option<String>,
  pub default: SpiceValue,
  pub kind: SpiceKind,
  #[serde(default)]
  pub depends_on: Vec<SpiceDependency>,
}

impl Spice {
  fn with_kind(id: impl Into<String>, label: impl Into<String>, default: SpiceValue, kind: SpiceKind) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      description: None,
      default,
      kind,
      depends_on: Vec::new(),
    }
  }

  pub fn boolean(id: impl Into<String>, label: impl Into<String>, default: bool) -> Self {
    Self::with_kind(id, label, SpiceValue::Boolean(default), SpiceKind::Boolean)
  }

  pub fn number(id: impl Into<String>, label: impl Into<String>, default: f64) -> Self {
    Self::with_kind(
      id,
      label,
      SpiceValue::Number(default),
      SpiceKind::Number {
        min: None,
        max: None,
        step: None,
      },
    )
  }

  pub fn string(id: impl Into<String>, label: impl Into<String>, default: impl Into<String>) -> Self {
    Self::with_kind(id, label, SpiceValue::String(default.into()), SpiceKind::String)
  }

  pub fn text(id: impl Into<String>, label: impl Into<String>, default: impl Into<String>) -> Self {
    Self::with_kind(id, label, SpiceValue::String(default.into()), SpiceKind::Text)
  }

  pub fn select(
    id: impl Into<String>,
    label: impl Into<String>,
    default: impl Into<SpiceValue>,
    options: Vec<SelectOption>,
  ) -> Self {
    Self::with_kind(id, label, default.into(), SpiceKind::Select { options })
  }

  pub fn custom(
    id: impl Into<String>,
    label: impl Into<String>,
    control: impl Into<String>,
    default: impl Into<SpiceValue>,
  ) -> Self {
    Self::with_kind(
      id,
      label,
      default.into(),
      SpiceKind::Custom {
        control: control.into(),
      },
    )
  }

  /// Sets min/max on a number spice. No effect on other kinds.
  pub fn range(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
    if let SpiceKind::Number { min, max, .. } = &mut self.kind {
      *min = lower;
      *max = upper;
    }
    self
  }

  pub fn step(mut self, increment: f64) -> Self {
    if let SpiceKind::Number { step, .. } = &mut self.kind {
      *step = Some(increment);
    }
    self
  }

  pub fn describe(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn depends_on(self, spice_id: impl Into<String>, value: impl Into<SpiceValue>) -> Self {
    self.depends_on_any(spice_id, vec![value.into()])
  }

  pub fn depends_on_any(mut self, spice_id: impl Into<String>, values: Vec<SpiceValue>) -> Self {
    self.depends_on.push(SpiceDependency {
      spice_id: spice_id.into(),
      values,
    });
    self
  }

  /// Sanitizes one raw value against this declaration.
  fn sanitize(&self, raw: Option<&SpiceValue>) -> SpiceValue {
    let Some(raw) = raw else {
      return self.default.clone();
    };

    match &self.kind {
      SpiceKind::Boolean => raw
        .to_input()
        .to_boolean(&CastOptions::new())
        .map(SpiceValue::Boolean)
        .unwrap_or_else(|_| self.default.clone()),
      SpiceKind::Number { min, max, .. } => {
        let options = CastOptions {
          fallback: None,
          min: *min,
          max: *max,
        };
        raw
          .to_input()
          .to_number(&options)
          .map(SpiceValue::Number)
          .unwrap_or_else(|_| self.default.clone())
      }
      SpiceKind::String | SpiceKind::Text => SpiceValue::String(raw.to_string()),
      SpiceKind::Select { options } => options
        .iter()
        .find(|option| option.value == *raw)
        .map(|option| option.value.clone())
        .unwrap_or_else(|| self.default.clone()),
      SpiceKind::Custom { control } => {
        event!(Level::WARN, spice = %self.id, %control, "Unknown spice control type, passing value through.");
        raw.clone()
      }
    }
  }
}

/// Produces a sanitized spice set for `ingredient`: exactly one entry per
/// declared spice, extra raw keys dropped.
pub fn validate(ingredient: &Ingredient, raw: &Spices) -> Spices {
  validate_declared(&ingredient.spices, raw)
}

pub(crate) fn validate_declared(declared: &[Spice], raw: &Spices) -> Spices {
  declared
    .iter()
    .map(|spice| (spice.id.clone(), spice.sanitize(raw.get(&spice.id))))
    .collect()
}

/// Ids of the spices currently visible, in declaration order.
pub fn visible_spices(ingredient: &Ingredient, current: &Spices) -> Vec<String> {
  let by_id: HashMap<&str, &Spice> = ingredient.spices.iter().map(|s| (s.id.as_str(), s)).collect();
  let mut resolved: HashMap<String, bool> = HashMap::new();
  let mut visiting: HashSet<String> = HashSet::new();

  ingredient
    .spices
    .iter()
    .filter(|spice| is_visible(&spice.id, &by_id, current, &mut resolved, &mut visiting))
    .map(|spice| spice.id.clone())
    .collect()
}

fn is_visible(
  spice_id: &str,
  by_id: &HashMap<&str, &Spice>,
  current: &Spices,
  resolved: &mut HashMap<String, bool>,
  visiting: &mut HashSet<String>,
) -> bool {
  if let Some(known) = resolved.get(spice_id) {
    return *known;
  }
  let Some(spice) = by_id.get(spice_id) else {
    event!(Level::WARN, %spice_id, "Visibility dependency names an undeclared spice.");
    return false;
  };
  if !visiting.insert(spice_id.to_string()) {
    event!(Level::ERROR, %spice_id, "Cyclic spice visibility dependency; treating spice as hidden.");
    return false;
  }

  let mut visible = true;
  for dependency in &spice.depends_on {
    if !is_visible(&dependency.spice_id, by_id, current, resolved, visiting) {
      visible = false;
      break;
    }
    let held = current
      .get(&dependency.spice_id)
      .or_else(|| by_id.get(dependency.spice_id.as_str()).map(|s| &s.default));
    if !held.is_some_and(|value| dependency.values.contains(value)) {
      visible = false;
      break;
    }
  }

  visiting.remove(spice_id);
  resolved.insert(spice_id.to_string(), visible);
  visible
}

/// Applies one user edit and re-validates the whole set.
///
/// Select values are first snapped to the declared option whose string form
/// matches, so a UI handing over `"2"` for a numeric option still selects it.
pub fn update_and_validate(ingredient: &Ingredient, current: &Spices, spice_id: &str, new_raw: SpiceValue) -> Spices {
  let snapped = match ingredient.spices.iter().find(|s| s.id == spice_id) {
    Some(Spice {
      kind: SpiceKind::Select { options },
      ..
    }) => {
      let wanted = new_raw.to_string();
      options
        .iter()
        .find(|option| option.value.to_string() == wanted)
        .map(|option| option.value.clone())
        .unwrap_or(new_raw)
    }
    Some(_) => new_raw,
    None => {
      event!(Level::WARN, ingredient = %ingredient.id, %spice_id, "Update for undeclared spice will be dropped.");
      new_raw
    }
  };

  let mut merged = current.clone();
  merged.insert(spice_id.to_string(), snapped);
  validate(ingredient, &merged)
}
