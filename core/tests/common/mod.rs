// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use mise::{
  CastOptions, CookContext, Ingredient, IngredientRegistry, InputType, Kitchen, KitchenConfig, Notifier, PanelInstruction,
  PanelTarget, Serving, Severity, Spice, Spices, TextPanel,
};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;

// --- Kitchen setup ---

/// Manual cooking, short intervals, no persistence.
pub fn test_config() -> KitchenConfig {
  KitchenConfig {
    auto_cook: false,
    min_interval_ms: 10,
    persist: false,
    ..KitchenConfig::default()
  }
}

pub fn kitchen_with(ingredients: Vec<Ingredient>) -> (Arc<IngredientRegistry>, Arc<Kitchen>) {
  let registry = Arc::new(IngredientRegistry::new());
  for ingredient in ingredients {
    registry.register(ingredient);
  }
  let kitchen = Kitchen::new(Arc::clone(&registry), test_config());
  (registry, kitchen)
}

// --- Common Ingredient Creators ---

pub fn uppercase() -> Ingredient {
  Ingredient::new_sync("uppercase", "Uppercase", |input, _spices| {
    Ok(InputType::new(input.to_string().to_uppercase()).into())
  })
}

pub fn append(id: &'static str, suffix: &'static str) -> Ingredient {
  Ingredient::new_sync(id, id, move |input, _spices| {
    Ok(InputType::new(format!("{}{}", input, suffix)).into())
  })
}

/// Divides the input by the `by` spice and fails on division by zero.
pub fn divide() -> Ingredient {
  Ingredient::new_sync("divide", "Divide", |input, spices: Spices| {
    let dividend = input.to_number(&CastOptions::new())?;
    let by = spices.get("by").and_then(|v| v.as_f64()).unwrap_or(1.0);
    if by == 0.0 {
      anyhow::bail!("Division by zero");
    }
    Ok(InputType::new(dividend / by).into())
  })
  .spice(Spice::number("by", "Divide by", 1.0))
}

pub fn failing(id: &'static str, message: &'static str) -> Ingredient {
  Ingredient::new_sync(id, id, move |_input, _spices| {
    tracing::warn!(target: "test_ingredients", ingredient = id, "failing with: '{}'", message);
    Err(anyhow::anyhow!(message))
  })
}

pub fn panicking(id: &'static str) -> Ingredient {
  Ingredient::new_sync(id, id, |_input, _spices| panic!("ingredient exploded"))
}

pub fn warning(id: &'static str, message: &'static str) -> Ingredient {
  Ingredient::new_sync(id, id, move |input, _spices| Ok(input.with_warning(message).into()))
}

pub fn nothing(id: &'static str) -> Ingredient {
  Ingredient::new_sync(id, id, |_input, _spices| Ok(Serving::Nothing))
}

pub fn output_panel(id: &'static str, title: &'static str) -> Ingredient {
  Ingredient::new_sync(id, id, move |_input, _spices| {
    Ok(Serving::Panel(PanelInstruction::text(
      PanelTarget::Output,
      TextPanel::titled(title),
    )))
  })
}

/// Replaces the input surface with its own spice editor.
pub fn spice_editor(id: &'static str) -> Ingredient {
  Ingredient::new(id, id, |input: InputType, _spices: Spices, ctx: CookContext| async move {
    let panel = PanelInstruction::spices(PanelTarget::Input, ctx.instance_id());
    Ok::<_, anyhow::Error>(Serving::Value(input.with_panel(panel)))
  })
}

/// Counts its runs and sleeps `delay` before passing the input on.
pub fn slow_counter(id: &'static str, runs: Arc<AtomicUsize>, delay: Duration) -> Ingredient {
  Ingredient::new(id, id, move |input: InputType, _spices: Spices, _ctx: CookContext| {
    let runs = Arc::clone(&runs);
    async move {
      runs.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(delay).await;
      Ok::<_, anyhow::Error>(Serving::Value(input))
    }
  })
}

/// Requests a re-cook interval and counts its runs.
pub fn interval_requester(id: &'static str, runs: Arc<AtomicUsize>, interval_ms: u64) -> Ingredient {
  Ingredient::new(id, id, move |input: InputType, _spices: Spices, ctx: CookContext| {
    let runs = Arc::clone(&runs);
    async move {
      runs.fetch_add(1, Ordering::SeqCst);
      ctx.request_interval(interval_ms);
      Ok::<_, anyhow::Error>(Serving::Value(input))
    }
  })
  .schedules_recook()
}

// --- Notifications ---

#[derive(Debug, Default)]
pub struct RecordingNotifier {
  pub messages: Mutex<Vec<(String, Severity)>>,
}

impl Notifier for RecordingNotifier {
  fn show(&self, message: &str, severity: Severity, _title: Option<&str>, _duration: Option<Duration>) {
    self.messages.lock().push((message.to_string(), severity));
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Lets spawned tasks (subscription, spawned cooks, timers) make progress.
pub async fn settle() {
  for _ in 0..20 {
    tokio::task::yield_now().await;
  }
}
