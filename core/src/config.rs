// mise/src/config.rs

use serde::Deserialize;
use std::env;

use crate::error::{MiseError, MiseResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
  /// Initial auto-cook flag.
  pub auto_cook: bool,
  /// Non-zero cook intervals below this are raised to it.
  pub min_interval_ms: u64,
  /// Prefix of every key the kitchen writes to its `Storage`.
  pub storage_prefix: String,
  pub persist: bool,
  /// Upper bound for the `repeat` ingredient's iteration count.
  pub max_repeat: u64,
}

impl Default for KitchenConfig {
  fn default() -> Self {
    Self {
      auto_cook: true,
      min_interval_ms: 100,
      storage_prefix: "mise".to_string(),
      persist: true,
      max_repeat: 100,
    }
  }
}

impl KitchenConfig {
  /// Reads `MISE_*` environment variables on top of the defaults.
  pub fn from_env() -> MiseResult<Self> {
    let defaults = Self::default();

    let auto_cook = parse_var("MISE_AUTO_COOK", defaults.auto_cook)?;
    let min_interval_ms = parse_var("MISE_MIN_INTERVAL_MS", defaults.min_interval_ms)?;
    let storage_prefix = env::var("MISE_STORAGE_PREFIX").unwrap_or(defaults.storage_prefix);
    let persist = parse_var("MISE_PERSIST", defaults.persist)?;
    let max_repeat = parse_var("MISE_MAX_REPEAT", defaults.max_repeat)?;

    if storage_prefix.trim().is_empty() {
      return Err(MiseError::Config {
        key: "MISE_STORAGE_PREFIX".to_string(),
        message: "must not be empty".to_string(),
      });
    }

    tracing::debug!(auto_cook, min_interval_ms, %storage_prefix, persist, max_repeat, "Kitchen configuration loaded.");

    Ok(Self {
      auto_cook,
      min_interval_ms,
      storage_prefix,
      persist,
      max_repeat,
    })
  }

  pub fn storage_key(&self, name: &str) -> String {
    format!("{}.{}", self.storage_prefix, name)
  }
}

fn parse_var<T>(key: &str, default: T) -> MiseResult<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(key) {
    Ok(raw) => raw.trim().parse::<T>().map_err(|e| MiseError::Config {
      key: key.to_string(),
      message: format!("invalid value '{}': {}", raw, e),
    }),
    Err(_) => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deserializes_partial_config_with_defaults() {
    let config: KitchenConfig = serde_json::from_str(r#"{"auto_cook": false}"#).unwrap();
    assert!(!config.auto_cook);
    assert_eq!(config.min_interval_ms, 100);
    assert_eq!(config.storage_key("recipe"), "mise.recipe");
  }
}
