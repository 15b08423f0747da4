// mise/src/pantry.rs

//! Built-in ingredients.

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, Level};

use crate::config::KitchenConfig;
use crate::ingredient::{CookContext, Ingredient, Serving};
use crate::kitchen::CookStatus;
use crate::registry::IngredientRegistry;
use crate::spice::{SelectOption, Spice, SpiceValue, Spices};
use crate::value::{CastOptions, InputType, PanelInstruction, PanelTarget, Payload, TextPanel, ValueKind};

pub const UPPER_CASE: &str = "upper_case";
pub const LOWER_CASE: &str = "lower_case";
pub const REVERSE: &str = "reverse";
pub const TO_BASE64: &str = "to_base64";
pub const FROM_BASE64: &str = "from_base64";
pub const TO_HEX: &str = "to_hex";
pub const COUNT_CHARS: &str = "count_chars";
pub const TEXT_PANEL: &str = "text_panel";
pub const TICKER: &str = "ticker";
pub const REPEAT: &str = "repeat";

/// Registers every built-in ingredient inside one registry batch.
pub fn register_all(registry: &IngredientRegistry, config: &KitchenConfig) {
  registry.start_batch();
  for ingredient in all(config) {
    registry.register(ingredient);
  }
  registry.end_batch();
  event!(Level::DEBUG, count = registry.len(), "Pantry registered.");
}

pub fn all(config: &KitchenConfig) -> Vec<Ingredient> {
  vec![
    upper_case(),
    lower_case(),
    reverse(),
    to_base64(),
    from_base64(),
    to_hex(),
    count_chars(),
    text_panel(),
    ticker(),
    repeat(config.max_repeat),
  ]
}

fn text_of(spices: &Spices, id: &str) -> String {
  spices.get(id).map(ToString::to_string).unwrap_or_default()
}

fn number_of(spices: &Spices, id: &str, default: f64) -> f64 {
  spices.get(id).and_then(SpiceValue::as_f64).unwrap_or(default)
}

fn flag_of(spices: &Spices, id: &str) -> bool {
  spices.get(id).and_then(SpiceValue::as_bool).unwrap_or(false)
}

pub fn upper_case() -> Ingredient {
  Ingredient::new_sync(UPPER_CASE, "Upper Case", |input, _spices| {
    Ok(InputType::new(input.to_string().to_uppercase()).into())
  })
  .category("Text")
  .description("Converts the text to upper case.")
}

pub fn lower_case() -> Ingredient {
  Ingredient::new_sync(LOWER_CASE, "Lower Case", |input, _spices| {
    Ok(InputType::new(input.to_string().to_lowercase()).into())
  })
  .category("Text")
  .description("Converts the text to lower case.")
}

pub fn reverse() -> Ingredient {
  Ingredient::new_sync(REVERSE, "Reverse", |input, spices| {
    let text = input.to_string();
    let reversed = match text_of(&spices, "by").as_str() {
      "line" => text.lines().rev().collect::<Vec<_>>().join("\n"),
      _ => text.chars().rev().collect(),
    };
    Ok(InputType::new(reversed).into())
  })
  .category("Text")
  .description("Reverses the text by character or by line.")
  .spice(Spice::select(
    "by",
    "Reverse by",
    "character",
    vec![
      SelectOption::new("Character", "character"),
      SelectOption::new("Line", "line"),
    ],
  ))
}

pub fn to_base64() -> Ingredient {
  Ingredient::new_sync(TO_BASE64, "To Base64", |input, _spices| {
    Ok(input.cast(ValueKind::Base64, &CastOptions::new())?.into())
  })
  .category("Encoding")
  .description("Encodes the data as standard Base64.")
}

pub fn from_base64() -> Ingredient {
  Ingredient::new_sync(FROM_BASE64, "From Base64", |input, _spices| {
    let text = input.to_string();
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).context("input is not valid Base64")?;
    let payload = match String::from_utf8(bytes) {
      Ok(text) => Payload::String(text),
      Err(e) => Payload::ByteArray(e.into_bytes()),
    };
    Ok(InputType::new(payload).into())
  })
  .category("Encoding")
  .description("Decodes standard Base64. Whitespace in the input is ignored.")
}

pub fn to_hex() -> Ingredient {
  Ingredient::new_sync(TO_HEX, "To Hex", |input, spices| {
    let encoded = input.cast(ValueKind::Hex, &CastOptions::new())?.to_string();
    let encoded = if flag_of(&spices, "uppercase") {
      encoded.to_uppercase()
    } else {
      encoded
    };
    Ok(InputType::new(encoded).into())
  })
  .category("Encoding")
  .description("Encodes the data as hexadecimal.")
  .spice(Spice::boolean("uppercase", "Upper-case digits", false))
}

pub fn count_chars() -> Ingredient {
  Ingredient::new_sync(COUNT_CHARS, "Count Characters", |input, spices| {
    let text = input.to_string();
    let count = match text_of(&spices, "unit").as_str() {
      "bytes" => text.len(),
      "lines" => text.lines().count(),
      _ => text.chars().count(),
    };
    Ok(InputType::new(count as f64).into())
  })
  .category("Text")
  .description("Counts characters, bytes or lines.")
  .spice(Spice::select(
    "unit",
    "Unit",
    "chars",
    vec![
      SelectOption::new("Characters", "chars"),
      SelectOption::new("Bytes", "bytes"),
      SelectOption::new("Lines", "lines"),
    ],
  ))
}

/// Leaves the data untouched and asks for a titled output text panel.
pub fn text_panel() -> Ingredient {
  Ingredient::new_sync(TEXT_PANEL, "Text Panel", |_input, spices| {
    let panel = TextPanel {
      title: Some(text_of(&spices, "title")).filter(|t| !t.is_empty()),
      placeholder: None,
      disabled: flag_of(&spices, "read_only"),
      show_clear: false,
    };
    Ok(Serving::Panel(PanelInstruction::text(PanelTarget::Output, panel)))
  })
  .category("Display")
  .description("Shows the output in a plain text panel.")
  .spice(Spice::string("title", "Title", "Output"))
  .spice(Spice::boolean("read_only", "Read only", true))
}

/// Emits how often it has run and asks for a re-cook every `interval_ms`.
pub fn ticker() -> Ingredient {
  let ticks = Arc::new(AtomicU64::new(0));
  Ingredient::new(TICKER, "Ticker", move |_input: InputType, spices: Spices, ctx: CookContext| {
    let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
    async move {
      let interval = number_of(&spices, "interval_ms", 1000.0).max(0.0) as u64;
      ctx.request_interval(interval);
      Ok::<_, anyhow::Error>(Serving::Value(InputType::new(tick as f64)))
    }
  })
  .category("Flow")
  .description("Counts its runs and re-cooks the recipe on an interval.")
  .schedules_recook()
  .spice(
    Spice::number("interval_ms", "Interval (ms)", 1000.0)
      .range(Some(0.0), None)
      .step(100.0),
  )
}

/// Applies the `count` steps preceding it `times` more times to the data.
///
/// Stops with a warning once a newer cook has started. A failing iteration
/// fails the repeat step.
pub fn repeat(max_times: u64) -> Ingredient {
  Ingredient::new(REPEAT, "Repeat", |input: InputType, spices: Spices, ctx: CookContext| async move {
    let times = number_of(&spices, "times", 1.0).max(0.0) as u64;
    let count = number_of(&spices, "count", 1.0).max(0.0) as usize;
    let delay = number_of(&spices, "delay_ms", 0.0).max(0.0) as u64;

    let end = ctx.index();
    let start = end.saturating_sub(count);
    let mut current = input.to_string();
    if start == end || times == 0 {
      return Ok(Serving::Value(InputType::new(current)));
    }

    for iteration in 1..=times {
      if iteration > 1 && delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
      }
      if ctx.is_stale() {
        event!(Level::DEBUG, iteration, "Repeat stopped: a newer cook started.");
        let stopped = InputType::new(current).with_warning("Repeat stopped: a newer cook started");
        return Ok(Serving::Value(stopped));
      }

      let result = ctx.cook_range(start..end, current.clone()).await;
      match result.status {
        CookStatus::Error => return Err(anyhow!("iteration {} failed: {}", iteration, result.output)),
        CookStatus::Warning => {
          let warning = result
            .step_warnings
            .values()
            .next()
            .cloned()
            .unwrap_or_else(|| format!("iteration {} produced a warning", iteration));
          return Ok(Serving::Value(InputType::new(result.output).with_warning(warning)));
        }
        CookStatus::Idle | CookStatus::Success => current = result.output,
      }
    }
    Ok::<_, anyhow::Error>(Serving::Value(InputType::new(current)))
  })
  .category("Flow")
  .description("Re-runs the preceding steps several times.")
  .spice(
    Spice::number("times", "Times", 1.0)
      .range(Some(1.0), Some(max_times as f64))
      .step(1.0),
  )
  .spice(Spice::number("count", "Preceding steps", 1.0).range(Some(1.0), None).step(1.0))
  .spice(Spice::number("delay_ms", "Delay (ms)", 0.0).range(Some(0.0), None))
}
