// mise/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::value::ValueKind;

/// Failure of a typed-value coercion. Carries the attempted target and the
/// kind of payload that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot cast {actual} to {target}{}", render_detail(.detail))]
pub struct CastError {
  pub target: ValueKind,
  pub actual: ValueKind,
  pub detail: Option<String>,
}

impl CastError {
  pub fn new(target: ValueKind, actual: ValueKind) -> Self {
    Self {
      target,
      actual,
      detail: None,
    }
  }

  pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
    self.detail = Some(detail.into());
    self
  }
}

fn render_detail(detail: &Option<String>) -> String {
  detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum MiseError {
  #[error(transparent)]
  Cast(#[from] CastError),

  #[error("Unsupported payload: {0}")]
  UnsupportedPayload(String),

  #[error("Ingredient not found: {ingredient_id}")]
  IngredientNotFound { ingredient_id: String },

  #[error("Recipe step not found: {instance_id}")]
  StepNotFound { instance_id: String },

  #[error("Spice '{spice_id}' is not declared by ingredient '{ingredient_id}'")]
  UnknownSpice { ingredient_id: String, spice_id: String },

  #[error("Invalid recipe document: {message}")]
  RecipeFormat { message: String },

  #[error("Extension '{source_id}' failed to load. Source: {source}")]
  Extension {
    source_id: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for '{key}': {message}")]
  Config { key: String, message: String },
}

impl From<serde_json::Error> for MiseError {
  fn from(err: serde_json::Error) -> Self {
    MiseError::RecipeFormat {
      message: err.to_string(),
    }
  }
}

pub type MiseResult<T, E = MiseError> = std::result::Result<T, E>;
