// mise/src/ingredient.rs

//! Ingredient definitions (the executable steps of a recipe) and the context
//! handed to an ingredient while it cooks.

use futures_util::future::BoxFuture;
use std::future::Future;
use std::ops::Range;
use std::pin::Pin;
use std::sync::Arc;

use crate::kitchen::cook::{cook_entries, CookSession};
use crate::kitchen::CookResult;
use crate::recipe::RecipeStep;
use crate::spice::{Spice, Spices};
use crate::value::{InputType, PanelInstruction};

/// What an ingredient hands back to the kitchen.
#[derive(Debug, Clone, PartialEq)]
pub enum Serving {
  /// A new value. A value carrying a warning halts the recipe.
  Value(InputType),
  /// A panel instruction only; the data flows on unchanged.
  Panel(PanelInstruction),
  /// No output. Halts the recipe with a warning.
  Nothing,
}

impl From<InputType> for Serving {
  fn from(value: InputType) -> Self {
    Serving::Value(value)
  }
}

pub type IngredientFuture = Pin<Box<dyn Future<Output = anyhow::Result<Serving>> + Send>>;

/// Type alias for an ingredient's executable function.
///
/// Receives the current data, the validated spices of its recipe step and a
/// `CookContext`, and resolves to a `Serving` or an error. Errors (and panics)
/// are caught by the kitchen and reported as the step's `error` status.
pub type IngredientFn = Arc<dyn Fn(InputType, Spices, CookContext) -> IngredientFuture + Send + Sync>;

/// Definition of an ingredient as held by the `IngredientRegistry`.
#[derive(Clone)]
pub struct Ingredient {
  pub id: String,
  /// Display name. Recipe documents refer to ingredients by this name, so an
  /// ingredient without one cannot be exported stably.
  pub name: String,
  pub category: String,
  pub description: String,
  pub spices: Vec<Spice>,
  /// Extension that registered this ingredient, if any.
  pub extension: Option<String>,
  /// Whether this ingredient may ask the kitchen to re-cook on an interval.
  pub schedules_recook: bool,
  run: IngredientFn,
}

impl Ingredient {
  pub fn new<F, Fut>(id: impl Into<String>, name: impl Into<String>, run: F) -> Self
  where
    F: Fn(InputType, Spices, CookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Serving>> + Send + 'static,
  {
    let run: IngredientFn = Arc::new(
      move |input: InputType, spices: Spices, ctx: CookContext| -> IngredientFuture { Box::pin(run(input, spices, ctx)) },
    );
    Self {
      id: id.into(),
      name: name.into(),
      category: String::new(),
      description: String::new(),
      spices: Vec::new(),
      extension: None,
      schedules_recook: false,
      run,
    }
  }

  /// Builds an ingredient from a synchronous function.
  pub fn new_sync<F>(id: impl Into<String>, name: impl Into<String>, run: F) -> Self
  where
    F: Fn(InputType, Spices) -> anyhow::Result<Serving> + Send + Sync + 'static,
  {
    let run = Arc::new(run);
    Self::new(id, name, move |input: InputType, spices: Spices, _ctx: CookContext| {
      let run = Arc::clone(&run);
      async move { run(input, spices) }
    })
  }

  pub fn category(mut self, category: impl Into<String>) -> Self {
    self.category = category.into();
    self
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn spice(mut self, spice: Spice) -> Self {
    self.spices.push(spice);
    self
  }

  pub fn extension(mut self, extension: impl Into<String>) -> Self {
    self.extension = Some(extension.into());
    self
  }

  pub fn schedules_recook(mut self) -> Self {
    self.schedules_recook = true;
    self
  }

  /// Name used in logs and error output; falls back to the id.
  pub fn display_name(&self) -> &str {
    if self.name.trim().is_empty() {
      &self.id
    } else {
      &self.name
    }
  }

  pub fn run(&self, input: InputType, spices: Spices, ctx: CookContext) -> IngredientFuture {
    (self.run)(input, spices, ctx)
  }
}

impl std::fmt::Debug for Ingredient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Ingredient")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("category", &self.category)
      .field("spices", &self.spices.len())
      .field("extension", &self.extension)
      .field("schedules_recook", &self.schedules_recook)
      .finish()
  }
}

/// Execution context passed to an ingredient.
#[derive(Clone)]
pub struct CookContext {
  pub(crate) index: usize,
  pub(crate) session: Arc<CookSession>,
}

impl CookContext {
  /// Position of the running step within the recipe.
  pub fn index(&self) -> usize {
    self.index
  }

  pub fn instance_id(&self) -> &str {
    self
      .session
      .recipe
      .get(self.index)
      .map(|step| step.instance_id.as_str())
      .unwrap_or_default()
  }

  pub fn recipe(&self) -> &[RecipeStep] {
    &self.session.recipe
  }

  /// The raw input the whole cook started from.
  pub fn original_input(&self) -> &str {
    &self.session.original_input
  }

  /// Version of the cook this step belongs to.
  pub fn cook_version(&self) -> u64 {
    self.session.cook_version
  }

  /// True once the kitchen state changed or another cook was requested
  /// after this cook started.
  pub fn is_stale(&self) -> bool {
    self.session.is_stale()
  }

  /// Asks the kitchen to re-cook every `ms` milliseconds. `0` clears the
  /// request. The last request of a cook wins.
  pub fn request_interval(&self, ms: u64) {
    *self.session.requested_interval.lock() = Some(ms);
  }

  /// Cooks `range` of the current recipe against `input`, using the same
  /// execution rules as a full cook.
  pub fn cook_range(&self, range: Range<usize>, input: String) -> BoxFuture<'static, CookResult> {
    let end = range.end.min(self.session.recipe.len());
    let start = range.start.min(end);
    cook_entries(Arc::clone(&self.session), start..end, input)
  }
}

impl std::fmt::Debug for CookContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CookContext")
      .field("index", &self.index)
      .field("cook_version", &self.session.cook_version)
      .field("recipe_len", &self.session.recipe.len())
      .finish()
  }
}
