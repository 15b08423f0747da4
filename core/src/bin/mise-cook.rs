// mise/src/bin/mise-cook.rs

//! Cooks a recipe document once against stdin.
//!
//! Usage: `mise-cook <recipe.json> < input.txt`

use anyhow::{bail, Context};
use std::io::Read;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use mise::{pantry, CookStatus, IngredientRegistry, Kitchen, KitchenConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let _ = dotenvy::dotenv();

  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .with_writer(std::io::stderr)
    .init();

  let Some(recipe_path) = std::env::args().nth(1) else {
    bail!("usage: mise-cook <recipe.json> < input");
  };

  let mut config = KitchenConfig::from_env()?;
  // One-shot run: nothing to persist and nobody to re-cook for.
  config.persist = false;
  config.auto_cook = false;

  let registry = Arc::new(IngredientRegistry::new());
  pantry::register_all(&registry, &config);

  let document = std::fs::read_to_string(&recipe_path)
    .with_context(|| format!("failed to read recipe document '{}'", recipe_path))?;
  let mut input = String::new();
  std::io::stdin()
    .read_to_string(&mut input)
    .context("failed to read input from stdin")?;

  let kitchen = Kitchen::new(Arc::clone(&registry), config);
  let imported = kitchen.import_recipe(&document)?;
  if !imported.missing.is_empty() {
    tracing::warn!(missing = ?imported.missing, "Some ingredients are not part of the pantry and were skipped.");
  }
  kitchen.set_input_data(input);
  kitchen.cook().await;

  let result = kitchen.result();
  println!("{}", result.output);
  for step in kitchen.recipe() {
    let status = result.status_of(&step.instance_id).unwrap_or_default();
    let name = registry.name_for_id(&step.ingredient_id).unwrap_or(step.ingredient_id);
    match result.warning_of(&step.instance_id) {
      Some(warning) => eprintln!("{:<20} {:?}: {}", name, status, warning),
      None => eprintln!("{:<20} {:?}", name, status),
    }
  }

  if result.status == CookStatus::Error {
    std::process::exit(1);
  }
  Ok(())
}
