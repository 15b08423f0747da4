// mise/src/kitchen/mod.rs

//! Defines `Kitchen`, the orchestrator that cooks the recipe against the
//! current input whenever either changes.
//!
//! Cooking is single-flight: a cook requested while another is running sets a
//! "re-cook wanted" flag instead of starting concurrently, and any number of
//! such requests collapse into exactly one follow-up cook. Steps run strictly
//! in order; the only cancellable artifact is the timer scheduled for
//! interval re-cooks.

pub(crate) mod cook;
pub mod result;
mod state;

pub use result::{CookResult, CookStatus};

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{event, instrument, Level};

use crate::config::KitchenConfig;
use crate::error::{MiseError, MiseResult};
use crate::recipe::{self, ImportedRecipe, RecipeStep};
use crate::registry::{IngredientRegistry, ListenerId};
use crate::services::{LogNotifier, Notifier, Severity, Storage};
use crate::spice::{self, SpiceValue, Spices};
use cook::{cook_entries, CookSession};
use state::{CookTrigger, KitchenState};

const INPUT_KEY: &str = "input";
const RECIPE_KEY: &str = "recipe";
const AUTO_COOK_KEY: &str = "auto_cook";

#[derive(Default)]
struct CookControl {
  cooking: bool,
  rerun_requested: bool,
  auto_cook: bool,
  interval_ms: Option<u64>,
  timer: Option<ScheduledCook>,
  next_timer_id: u64,
}

struct ScheduledCook {
  id: u64,
  handle: JoinHandle<()>,
}

pub struct Kitchen {
  me: Weak<Kitchen>,
  registry: Arc<IngredientRegistry>,
  registry_listener: ListenerId,
  config: KitchenConfig,
  storage: Option<Arc<dyn Storage>>,
  notifier: Arc<dyn Notifier>,
  state: RwLock<KitchenState>,
  trigger_tx: watch::Sender<CookTrigger>,
  result_tx: watch::Sender<Arc<CookResult>>,
  control: Mutex<CookControl>,
  cook_version: Arc<AtomicU64>,
  // Bumped by every change that makes an in-flight cook outdated.
  request_generation: Arc<AtomicU64>,
}

impl Kitchen {
  /// Creates a kitchen without persistence that logs its notifications.
  pub fn new(registry: Arc<IngredientRegistry>, config: KitchenConfig) -> Arc<Self> {
    Self::with_services(registry, config, None, Arc::new(LogNotifier))
  }

  pub fn with_services(
    registry: Arc<IngredientRegistry>,
    config: KitchenConfig,
    storage: Option<Arc<dyn Storage>>,
    notifier: Arc<dyn Notifier>,
  ) -> Arc<Self> {
    Arc::new_cyclic(|me: &Weak<Kitchen>| {
      let weak = me.clone();
      let registry_listener = registry.subscribe(move |_change| {
        if let Some(kitchen) = weak.upgrade() {
          kitchen.revalidate_recipe();
        }
      });
      let (trigger_tx, _) = watch::channel(CookTrigger::default());
      let (result_tx, _) = watch::channel(Arc::new(CookResult::default()));
      let control = CookControl {
        auto_cook: config.auto_cook,
        ..CookControl::default()
      };

      Kitchen {
        me: me.clone(),
        registry,
        registry_listener,
        config,
        storage,
        notifier,
        state: RwLock::new(KitchenState::default()),
        trigger_tx,
        result_tx,
        control: Mutex::new(control),
        cook_version: Arc::new(AtomicU64::new(0)),
        request_generation: Arc::new(AtomicU64::new(0)),
      }
    })
  }

  pub fn registry(&self) -> &Arc<IngredientRegistry> {
    &self.registry
  }

  pub fn config(&self) -> &KitchenConfig {
    &self.config
  }

  // --- Input ---

  pub fn set_input_data(&self, text: impl Into<String>) {
    let text = text.into();
    self.persist(INPUT_KEY, &text);
    self.state.write().input_data = text;
    self.supersede_cook();
    self.publish_trigger();
  }

  pub fn input_data(&self) -> String {
    self.state.read().input_data.clone()
  }

  // --- Cooking ---

  /// Cooks the recipe against the current input and publishes the result.
  ///
  /// Returns immediately when a batch update is open, or when another cook is
  /// in flight (in which case one follow-up cook is queued). Never fails:
  /// step failures end up in the published `CookResult`.
  #[instrument(name = "Kitchen::cook", skip_all)]
  pub async fn cook(&self) {
    if self.state.read().batching {
      event!(Level::DEBUG, "Cook request dropped: batch update in progress.");
      return;
    }
    {
      let mut control = self.control.lock();
      if control.cooking {
        control.rerun_requested = true;
        self.supersede_cook();
        event!(Level::TRACE, "Cook in flight, queued a re-cook.");
        return;
      }
      control.cooking = true;
    }
    let mut guard = CookingGuard {
      kitchen: self,
      armed: true,
    };

    loop {
      self.cancel_scheduled_cook();
      self.cook_once().await;

      let batching = self.state.read().batching;
      let mut control = self.control.lock();
      if control.rerun_requested && !batching {
        control.rerun_requested = false;
        event!(Level::DEBUG, "Running queued re-cook.");
        continue;
      }
      control.rerun_requested = false;
      control.cooking = false;
      guard.armed = false;
      break;
    }

    self.schedule_next_cook();
  }

  async fn cook_once(&self) {
    let version = self.cook_version.fetch_add(1, Ordering::SeqCst) + 1;
    let (input, recipe) = {
      let state = self.state.read();
      (state.input_data.clone(), state.recipe.clone())
    };

    let can_reschedule = recipe.iter().any(|step| {
      self
        .registry
        .get(&step.ingredient_id)
        .is_some_and(|ingredient| ingredient.schedules_recook)
    });
    if !can_reschedule {
      let cleared = self.control.lock().interval_ms.take();
      if cleared.is_some() {
        event!(Level::DEBUG, "No step can request an interval any more; interval cleared.");
      }
    }

    let steps = recipe.len();
    let session = Arc::new(CookSession::new(
      Arc::clone(&self.registry),
      Arc::from(recipe),
      Arc::from(input.as_str()),
      version,
      Arc::clone(&self.request_generation),
    ));

    let cooked = AssertUnwindSafe(cook_entries(Arc::clone(&session), 0..steps, input))
      .catch_unwind()
      .await;
    match cooked {
      Ok(result) => {
        if let Some(ms) = session.take_requested_interval() {
          self.set_cooking_interval(ms);
        }
        event!(Level::INFO, version, steps, status = ?result.status, "Cook complete.");
        self.result_tx.send_replace(Arc::new(result));
      }
      Err(_) => {
        event!(Level::ERROR, version, "Cook aborted by an internal failure; previous result kept.");
      }
    }
  }

  /// Version of the most recently started cook.
  pub fn cook_version(&self) -> u64 {
    self.cook_version.load(Ordering::SeqCst)
  }

  /// Marks any in-flight cook as stale so long-running steps can stop early.
  fn supersede_cook(&self) {
    self.request_generation.fetch_add(1, Ordering::SeqCst);
  }

  pub fn is_cooking(&self) -> bool {
    self.control.lock().cooking
  }

  pub fn result(&self) -> Arc<CookResult> {
    Arc::clone(&self.result_tx.borrow())
  }

  /// Receives every published `CookResult`.
  pub fn subscribe_results(&self) -> watch::Receiver<Arc<CookResult>> {
    self.result_tx.subscribe()
  }

  // --- Auto-cook and interval ---

  pub fn is_auto_cook(&self) -> bool {
    self.control.lock().auto_cook
  }

  /// Flips auto-cook and returns the new state.
  pub fn toggle_auto_cook(&self) -> bool {
    let enabled = !self.is_auto_cook();
    self.set_auto_cook(enabled);
    enabled
  }

  /// Disabling cancels any scheduled re-cook and drops a queued one;
  /// enabling cooks right away.
  pub fn set_auto_cook(&self, enabled: bool) {
    let cancelled = {
      let mut control = self.control.lock();
      if control.auto_cook == enabled {
        return;
      }
      control.auto_cook = enabled;
      if enabled {
        None
      } else {
        control.rerun_requested = false;
        self.supersede_cook();
        control.timer.take()
      }
    };
    if let Some(timer) = cancelled {
      timer.handle.abort();
    }
    event!(Level::DEBUG, enabled, "Auto-cook toggled.");
    self.persist(AUTO_COOK_KEY, &enabled.to_string());
    if enabled {
      self.spawn_cook();
    }
  }

  /// Sets the interval for re-cooking after each cook. `0` clears it;
  /// anything below `min_interval_ms` is raised to it.
  pub fn set_cooking_interval(&self, ms: u64) {
    let interval = (ms > 0).then(|| ms.max(self.config.min_interval_ms));
    let cancelled = {
      let mut control = self.control.lock();
      control.interval_ms = interval;
      if interval.is_none() {
        control.timer.take()
      } else {
        None
      }
    };
    if let Some(timer) = cancelled {
      timer.handle.abort();
    }
  }

  pub fn cooking_interval(&self) -> Option<u64> {
    self.control.lock().interval_ms
  }

  pub fn has_scheduled_cook(&self) -> bool {
    self.control.lock().timer.is_some()
  }

  fn cancel_scheduled_cook(&self) {
    let timer = self.control.lock().timer.take();
    if let Some(timer) = timer {
      timer.handle.abort();
    }
  }

  fn schedule_next_cook(&self) {
    let mut control = self.control.lock();
    let Some(ms) = control.interval_ms else {
      return;
    };
    if !control.auto_cook {
      return;
    }
    let Ok(runtime) = Handle::try_current() else {
      event!(Level::WARN, "No async runtime available; interval re-cook not scheduled.");
      return;
    };
    if let Some(previous) = control.timer.take() {
      previous.handle.abort();
    }

    control.next_timer_id += 1;
    let id = control.next_timer_id;
    let weak = self.me.clone();
    let handle = runtime.spawn(async move {
      tokio::time::sleep(Duration::from_millis(ms)).await;
      let Some(kitchen) = weak.upgrade() else {
        return;
      };
      {
        let mut control = kitchen.control.lock();
        let still_current = control.timer.as_ref().is_some_and(|timer| timer.id == id);
        if !still_current {
          return;
        }
        // Detach our own handle so the cook below does not abort this task.
        control.timer = None;
      }
      event!(Level::DEBUG, interval_ms = ms, "Interval elapsed, re-cooking.");
      kitchen.cook().await;
    });
    control.timer = Some(ScheduledCook { id, handle });
  }

  fn spawn_cook(&self) {
    let Some(kitchen) = self.me.upgrade() else {
      return;
    };
    match Handle::try_current() {
      Ok(runtime) => {
        runtime.spawn(async move { kitchen.cook().await });
      }
      Err(_) => event!(Level::WARN, "No async runtime available; cook request ignored."),
    }
  }

  // --- Reactive subscription ---

  /// Starts the task that cooks whenever the observed state changes while
  /// auto-cook is on. Dropping the returned handle stops it.
  ///
  /// # Panics
  ///
  /// Panics when called outside a Tokio runtime.
  pub fn install_subscription(&self) -> KitchenSubscription {
    let mut rx = self.trigger_tx.subscribe();
    let mut last = rx.borrow_and_update().clone();
    let weak = self.me.clone();
    let handle = tokio::spawn(async move {
      while rx.changed().await.is_ok() {
        let trigger = rx.borrow_and_update().clone();
        if trigger.batching || trigger.same_content(&last) {
          continue;
        }
        last = trigger;
        let Some(kitchen) = weak.upgrade() else {
          break;
        };
        if kitchen.is_auto_cook() {
          kitchen.spawn_cook();
        }
      }
      event!(Level::DEBUG, "Kitchen subscription finished.");
    });
    KitchenSubscription { handle }
  }

  fn publish_trigger(&self) {
    let trigger = self.state.read().trigger();
    self.trigger_tx.send_if_modified(|current| {
      if *current == trigger {
        false
      } else {
        *current = trigger;
        true
      }
    });
  }

  // --- Recipe ---

  pub fn recipe(&self) -> Vec<RecipeStep> {
    self.state.read().recipe.clone()
  }

  pub fn set_recipe(&self, steps: Vec<RecipeStep>) {
    let steps = steps.into_iter().map(|step| self.validated(step)).collect();
    self.state.write().recipe = steps;
    self.recipe_changed();
  }

  /// Appends a step for `ingredient_id` with default spices and returns its
  /// instance id.
  pub fn add_step(&self, ingredient_id: &str) -> MiseResult<String> {
    let ingredient = self
      .registry
      .get(ingredient_id)
      .ok_or_else(|| MiseError::IngredientNotFound {
        ingredient_id: ingredient_id.to_string(),
      })?;
    let mut step = RecipeStep::new(ingredient_id);
    step.spices = spice::validate(&ingredient, &Spices::new());
    let instance_id = step.instance_id.clone();
    self.state.write().recipe.push(step);
    self.recipe_changed();
    Ok(instance_id)
  }

  pub fn remove_step(&self, instance_id: &str) -> MiseResult<RecipeStep> {
    let removed = {
      let mut state = self.state.write();
      let index = state.position_of(instance_id).ok_or_else(|| step_not_found(instance_id))?;
      state.recipe.remove(index)
    };
    self.recipe_changed();
    Ok(removed)
  }

  /// Moves a step to `to` (clamped to the end of the recipe).
  pub fn move_step(&self, instance_id: &str, to: usize) -> MiseResult<()> {
    {
      let mut state = self.state.write();
      let from = state.position_of(instance_id).ok_or_else(|| step_not_found(instance_id))?;
      let step = state.recipe.remove(from);
      let to = to.min(state.recipe.len());
      state.recipe.insert(to, step);
    }
    self.recipe_changed();
    Ok(())
  }

  /// Flips the paused flag of a step and returns the new value.
  pub fn toggle_pause(&self, instance_id: &str) -> MiseResult<bool> {
    let paused = {
      let mut state = self.state.write();
      let index = state.position_of(instance_id).ok_or_else(|| step_not_found(instance_id))?;
      let step = &mut state.recipe[index];
      step.paused = !step.paused;
      step.paused
    };
    self.recipe_changed();
    Ok(paused)
  }

  pub fn set_spice(&self, instance_id: &str, spice_id: &str, value: impl Into<SpiceValue>) -> MiseResult<()> {
    let ingredient_id = {
      let state = self.state.read();
      let index = state.position_of(instance_id).ok_or_else(|| step_not_found(instance_id))?;
      state.recipe[index].ingredient_id.clone()
    };
    let ingredient = self
      .registry
      .get(&ingredient_id)
      .ok_or_else(|| MiseError::IngredientNotFound {
        ingredient_id: ingredient_id.clone(),
      })?;
    if !ingredient.spices.iter().any(|spice| spice.id == spice_id) {
      return Err(MiseError::UnknownSpice {
        ingredient_id,
        spice_id: spice_id.to_string(),
      });
    }

    {
      let mut state = self.state.write();
      let index = state.position_of(instance_id).ok_or_else(|| step_not_found(instance_id))?;
      let step = &mut state.recipe[index];
      step.spices = spice::update_and_validate(&ingredient, &step.spices, spice_id, value.into());
    }
    self.recipe_changed();
    Ok(())
  }

  /// Opens a bulk recipe update. Cook requests are dropped until `end_batch`.
  pub fn start_batch(&self) {
    self.state.write().batching = true;
    self.publish_trigger();
  }

  pub fn end_batch(&self) {
    self.state.write().batching = false;
    self.publish_trigger();
    self.persist_recipe();
  }

  pub fn is_batching(&self) -> bool {
    self.state.read().batching
  }

  fn validated(&self, mut step: RecipeStep) -> RecipeStep {
    if let Some(ingredient) = self.registry.get(&step.ingredient_id) {
      step.spices = spice::validate(&ingredient, &step.spices);
    }
    step
  }

  /// Re-validates the spices of every step against the registry's current
  /// definitions. Steps whose ingredient is missing are left untouched.
  fn revalidate_recipe(&self) {
    let changed = {
      let mut state = self.state.write();
      let mut changed = false;
      for step in state.recipe.iter_mut() {
        if let Some(ingredient) = self.registry.get(&step.ingredient_id) {
          let validated = spice::validate(&ingredient, &step.spices);
          if validated != step.spices {
            step.spices = validated;
            changed = true;
          }
        }
      }
      changed
    };
    if changed {
      event!(Level::DEBUG, "Recipe spices re-validated after registry change.");
      self.recipe_changed();
    }
  }

  fn recipe_changed(&self) {
    self.supersede_cook();
    self.publish_trigger();
    if !self.is_batching() {
      self.persist_recipe();
    }
  }

  // --- Recipe documents and persistence ---

  pub fn export_recipe(&self) -> MiseResult<String> {
    let steps = self.recipe();
    recipe::export_recipe(&steps, &self.registry)
  }

  /// Replaces the recipe with the one described by `json`. Unknown
  /// ingredients are skipped and reported through the notifier.
  pub fn import_recipe(&self, json: &str) -> MiseResult<ImportedRecipe> {
    let imported = recipe::import_recipe(json, &self.registry)?;
    self.report_missing(&imported.missing);
    self.state.write().recipe = imported.steps.clone();
    self.recipe_changed();
    Ok(imported)
  }

  /// Loads the persisted auto-cook flag, input and recipe.
  pub fn restore(&self) {
    let Some(storage) = self.storage.clone() else {
      return;
    };

    if let Some(flag) = storage.get(&self.config.storage_key(AUTO_COOK_KEY)) {
      match flag.parse::<bool>() {
        Ok(enabled) => self.control.lock().auto_cook = enabled,
        Err(_) => event!(Level::WARN, %flag, "Ignoring unreadable persisted auto-cook flag."),
      }
    }

    let input = storage.get(&self.config.storage_key(INPUT_KEY));
    let imported = storage
      .get(&self.config.storage_key(RECIPE_KEY))
      .and_then(|json| match recipe::import_recipe(&json, &self.registry) {
        Ok(imported) => Some(imported),
        Err(e) => {
          event!(Level::WARN, error = %e, "Ignoring unreadable persisted recipe.");
          self
            .notifier
            .show("The saved recipe could not be read.", Severity::Warning, Some("Restore"), None);
          None
        }
      });

    if let Some(imported) = &imported {
      self.report_missing(&imported.missing);
    }
    {
      let mut state = self.state.write();
      if let Some(input) = input {
        state.input_data = input;
      }
      if let Some(imported) = imported {
        state.recipe = imported.steps;
      }
    }
    event!(Level::DEBUG, "Kitchen state restored.");
    self.publish_trigger();
  }

  fn report_missing(&self, missing: &[String]) {
    if missing.is_empty() {
      return;
    }
    self.notifier.show(
      &format!("Skipped unknown ingredients: {}", missing.join(", ")),
      Severity::Warning,
      Some("Recipe import"),
      None,
    );
  }

  fn persist_recipe(&self) {
    match self.export_recipe() {
      Ok(json) => self.persist(RECIPE_KEY, &json),
      Err(e) => event!(Level::WARN, error = %e, "Recipe could not be serialized for persistence."),
    }
  }

  fn persist(&self, name: &str, value: &str) {
    if !self.config.persist {
      return;
    }
    let Some(storage) = &self.storage else {
      return;
    };
    if !storage.set(&self.config.storage_key(name), value) {
      event!(Level::WARN, key = name, "Failed to persist kitchen state.");
    }
  }
}

impl Drop for Kitchen {
  fn drop(&mut self) {
    self.registry.unsubscribe(self.registry_listener);
    if let Some(timer) = self.control.get_mut().timer.take() {
      timer.handle.abort();
    }
  }
}

impl std::fmt::Debug for Kitchen {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Kitchen")
      .field("steps", &self.state.read().recipe.len())
      .field("cook_version", &self.cook_version())
      .field("auto_cook", &self.is_auto_cook())
      .finish()
  }
}

fn step_not_found(instance_id: &str) -> MiseError {
  MiseError::StepNotFound {
    instance_id: instance_id.to_string(),
  }
}

/// Resets the single-flight flag if a cook future is dropped mid-flight.
struct CookingGuard<'a> {
  kitchen: &'a Kitchen,
  armed: bool,
}

impl Drop for CookingGuard<'_> {
  fn drop(&mut self) {
    if self.armed {
      let mut control = self.kitchen.control.lock();
      control.cooking = false;
      control.rerun_requested = false;
    }
  }
}

/// Handle to the task started by `Kitchen::install_subscription`.
#[derive(Debug)]
pub struct KitchenSubscription {
  handle: JoinHandle<()>,
}

impl KitchenSubscription {
  pub fn shutdown(self) {
    self.handle.abort();
  }
}

impl Drop for KitchenSubscription {
  fn drop(&mut self) {
    self.handle.abort();
  }
}
