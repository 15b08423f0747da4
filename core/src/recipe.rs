// mise/src/recipe.rs

//! Recipe steps (ingredient occurrences within a recipe) and the JSON recipe
//! document used for export and import.
//!
//! Documents refer to ingredients by display name, resolved through the
//! registry's name <-> id mapping, so they stay valid across sessions.

use serde::{Deserialize, Serialize};
use tracing::{event, Level};
use uuid::Uuid;

use crate::error::{MiseError, MiseResult};
use crate::registry::IngredientRegistry;
use crate::spice::{self, SpiceValue, Spices};

pub const RECIPE_DOCUMENT_VERSION: u32 = 1;

/// One occurrence of an ingredient in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
  /// Unique per occurrence; the same ingredient may appear several times.
  pub instance_id: String,
  pub ingredient_id: String,
  #[serde(default)]
  pub spices: Spices,
  #[serde(default)]
  pub paused: bool,
}

impl RecipeStep {
  pub fn new(ingredient_id: impl Into<String>) -> Self {
    Self {
      instance_id: Uuid::new_v4().to_string(),
      ingredient_id: ingredient_id.into(),
      spices: Spices::new(),
      paused: false,
    }
  }

  pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
    self.instance_id = instance_id.into();
    self
  }

  pub fn with_spice(mut self, spice_id: impl Into<String>, value: impl Into<SpiceValue>) -> Self {
    self.spices.insert(spice_id.into(), value.into());
    self
  }

  pub fn paused(mut self, paused: bool) -> Self {
    self.paused = paused;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDocument {
  pub version: u32,
  pub ingredients: Vec<RecipeDocumentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDocumentEntry {
  pub name: String,
  #[serde(default)]
  pub spices: Spices,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub paused: bool,
}

/// Result of importing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRecipe {
  pub steps: Vec<RecipeStep>,
  /// Names in the document that matched no registered ingredient.
  pub missing: Vec<String>,
}

pub fn export_recipe(steps: &[RecipeStep], registry: &IngredientRegistry) -> MiseResult<String> {
  let ingredients = steps
    .iter()
    .map(|step| {
      let name = registry.name_for_id(&step.ingredient_id).unwrap_or_else(|| {
        event!(Level::WARN, ingredient_id = %step.ingredient_id, "No display name for ingredient, exporting by id.");
        step.ingredient_id.clone()
      });
      RecipeDocumentEntry {
        name,
        spices: step.spices.clone(),
        paused: step.paused,
      }
    })
    .collect();

  let document = RecipeDocument {
    version: RECIPE_DOCUMENT_VERSION,
    ingredients,
  };
  Ok(serde_json::to_string(&document)?)
}

/// Parses a recipe document. Entries naming unknown ingredients are dropped
/// and reported in `missing`; spices of known ones are validated.
pub fn import_recipe(json: &str, registry: &IngredientRegistry) -> MiseResult<ImportedRecipe> {
  let document: RecipeDocument = serde_json::from_str(json)?;
  if document.version != RECIPE_DOCUMENT_VERSION {
    return Err(MiseError::RecipeFormat {
      message: format!(
        "unsupported document version {} (expected {})",
        document.version, RECIPE_DOCUMENT_VERSION
      ),
    });
  }

  let mut steps = Vec::with_capacity(document.ingredients.len());
  let mut missing = Vec::new();
  for entry in document.ingredients {
    let ingredient = registry
      .id_for_name(&entry.name)
      .and_then(|id| registry.get(&id))
      .or_else(|| registry.get(&entry.name));
    match ingredient {
      Some(ingredient) => steps.push(RecipeStep {
        instance_id: Uuid::new_v4().to_string(),
        ingredient_id: ingredient.id.clone(),
        spices: spice::validate(&ingredient, &entry.spices),
        paused: entry.paused,
      }),
      None => {
        event!(Level::WARN, name = %entry.name, "Recipe document names an unknown ingredient.");
        missing.push(entry.name);
      }
    }
  }

  Ok(ImportedRecipe { steps, missing })
}
