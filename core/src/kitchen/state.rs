// mise/src/kitchen/state.rs

//! Shared kitchen state and the tuple the cook subscription observes.

use crate::recipe::RecipeStep;
use crate::spice::Spices;

#[derive(Debug, Clone, Default)]
pub(crate) struct KitchenState {
  pub(crate) input_data: String,
  pub(crate) recipe: Vec<RecipeStep>,
  /// A bulk recipe mutation is in progress; cook requests are dropped.
  pub(crate) batching: bool,
}

impl KitchenState {
  pub(crate) fn trigger(&self) -> CookTrigger {
    CookTrigger {
      input_data: self.input_data.clone(),
      shape: self
        .recipe
        .iter()
        .map(|step| StepShape {
          instance_id: step.instance_id.clone(),
          ingredient_id: step.ingredient_id.clone(),
          spices: step.spices.clone(),
        })
        .collect(),
      paused: self
        .recipe
        .iter()
        .filter(|step| step.paused)
        .map(|step| step.instance_id.clone())
        .collect(),
      batching: self.batching,
    }
  }

  pub(crate) fn position_of(&self, instance_id: &str) -> Option<usize> {
    self.recipe.iter().position(|step| step.instance_id == instance_id)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepShape {
  pub(crate) instance_id: String,
  pub(crate) ingredient_id: String,
  pub(crate) spices: Spices,
}

/// Everything whose change should re-cook the recipe. Sent through a watch
/// channel with `send_if_modified`, so equal tuples never wake the subscriber.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CookTrigger {
  pub(crate) input_data: String,
  pub(crate) shape: Vec<StepShape>,
  pub(crate) paused: Vec<String>,
  pub(crate) batching: bool,
}

impl CookTrigger {
  /// Same tuple ignoring the batching flag.
  pub(crate) fn same_content(&self, other: &CookTrigger) -> bool {
    self.input_data == other.input_data && self.shape == other.shape && self.paused == other.paused
  }
}
