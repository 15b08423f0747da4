// mise/src/kitchen/cook.rs

//! The execution primitive shared by full cooks and sub-range cooks (e.g. the
//! `repeat` ingredient): runs a slice of the recipe sequentially, threading
//! the string projection of each step's output into the next.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{event, info_span, Instrument, Level};

use crate::ingredient::{CookContext, Serving};
use crate::kitchen::result::{CookResult, CookStatus};
use crate::recipe::RecipeStep;
use crate::registry::IngredientRegistry;
use crate::spice;
use crate::value::{InputType, PanelInstruction, PanelTarget};

/// State shared by every step of one top-level cook.
pub(crate) struct CookSession {
  pub(crate) registry: Arc<IngredientRegistry>,
  pub(crate) recipe: Arc<[RecipeStep]>,
  pub(crate) original_input: Arc<str>,
  pub(crate) cook_version: u64,
  generation: u64,
  latest_generation: Arc<AtomicU64>,
  pub(crate) requested_interval: Mutex<Option<u64>>,
}

impl CookSession {
  pub(crate) fn new(
    registry: Arc<IngredientRegistry>,
    recipe: Arc<[RecipeStep]>,
    original_input: Arc<str>,
    cook_version: u64,
    latest_generation: Arc<AtomicU64>,
  ) -> Self {
    let generation = latest_generation.load(Ordering::SeqCst);
    Self {
      registry,
      recipe,
      original_input,
      cook_version,
      generation,
      latest_generation,
      requested_interval: Mutex::new(None),
    }
  }

  /// True once the kitchen state changed or another cook was requested
  /// after this cook started.
  pub(crate) fn is_stale(&self) -> bool {
    self.latest_generation.load(Ordering::SeqCst) != self.generation
  }

  pub(crate) fn take_requested_interval(&self) -> Option<u64> {
    self.requested_interval.lock().take()
  }
}

/// Cooks `range` of the session's recipe starting from `input`.
///
/// Stops at the first missing ingredient, failing step or warning. Never
/// fails itself: every step failure is folded into the returned result.
pub(crate) fn cook_entries(session: Arc<CookSession>, range: Range<usize>, input: String) -> BoxFuture<'static, CookResult> {
  let span = info_span!(
    "cook",
    cook_version = session.cook_version,
    start = range.start,
    end = range.end
  );
  async move {
    let mut result = CookResult::default();
    if range.is_empty() {
      result.status = if input.is_empty() { CookStatus::Idle } else { CookStatus::Success };
      result.output = input;
      return result;
    }

    let mut current = input;
    let mut halted_with = None;

    for index in range {
      let step = &session.recipe[index];
      let instance_id = step.instance_id.clone();

      if step.paused {
        event!(Level::TRACE, %instance_id, "Step paused, skipping.");
        result.step_statuses.insert(instance_id, CookStatus::Idle);
        continue;
      }

      let Some(ingredient) = session.registry.get(&step.ingredient_id) else {
        event!(Level::ERROR, %instance_id, ingredient_id = %step.ingredient_id, "Ingredient not found in registry.");
        current = format!("Ingredient '{}' is not available", step.ingredient_id);
        result.step_statuses.insert(instance_id, CookStatus::Error);
        halted_with = Some(CookStatus::Error);
        break;
      };

      let spices = spice::validate(&ingredient, &step.spices);
      let ctx = CookContext {
        index,
        session: Arc::clone(&session),
      };
      let step_span = info_span!("recipe_step", index, %instance_id, ingredient = %ingredient.id);
      let outcome = AssertUnwindSafe(ingredient.run(InputType::new(current.clone()), spices, ctx))
        .catch_unwind()
        .instrument(step_span)
        .await;

      let failure = match outcome {
        Err(panic) => Some(panic_message(&*panic)),
        Ok(Err(err)) => Some(format!("{:#}", err)),
        Ok(Ok(serving)) => {
          match serving {
            Serving::Nothing => {
              result
                .step_warnings
                .insert(instance_id.clone(), format!("{} produced no output", ingredient.display_name()));
              result.step_statuses.insert(instance_id, CookStatus::Warning);
              halted_with = Some(CookStatus::Warning);
              break;
            }
            Serving::Value(value) if value.warning().is_some() => {
              let warning = value.warning().unwrap_or_default().to_string();
              event!(Level::DEBUG, %instance_id, %warning, "Step returned a warning, halting.");
              result.step_warnings.insert(instance_id.clone(), warning);
              result.step_statuses.insert(instance_id, CookStatus::Warning);
              halted_with = Some(CookStatus::Warning);
              break;
            }
            Serving::Panel(panel) => {
              record_panel(&mut result, panel, &instance_id);
            }
            Serving::Value(value) => {
              if let Some(panel) = value.panel() {
                record_panel(&mut result, panel.clone(), &instance_id);
              }
              current = value.to_string();
            }
          }
          None
        }
      };

      match failure {
        Some(message) => {
          event!(Level::WARN, %instance_id, error = %message, "Step failed, halting.");
          current = format!("Error in {}: {}", ingredient.display_name(), message);
          result.step_statuses.insert(instance_id, CookStatus::Error);
          halted_with = Some(CookStatus::Error);
          break;
        }
        None => {
          result.step_statuses.insert(instance_id, CookStatus::Success);
        }
      }
    }

    result.status = halted_with.unwrap_or(CookStatus::Success);
    result.output = current;
    event!(Level::DEBUG, status = ?result.status, "Cook finished.");
    result
  }
  .instrument(span)
  .boxed()
}

// Last panel per target wins.
fn record_panel(result: &mut CookResult, panel: PanelInstruction, instance_id: &str) {
  let panel = panel.with_source(instance_id);
  match panel.target {
    PanelTarget::Input => {
      result.spice_panel_source = panel.is_spice_editor().then(|| instance_id.to_string());
      result.input_panel = Some(panel);
    }
    PanelTarget::Output => {
      result.output_panel = Some(panel);
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  panic
    .downcast_ref::<&str>()
    .map(|s| s.to_string())
    .or_else(|| panic.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "ingredient panicked".to_string())
}
