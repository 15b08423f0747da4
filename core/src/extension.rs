// mise/src/extension.rs

//! Loads ingredient definitions from external sources into the registry.
//!
//! Fetching (network, manifests, mirrors) is behind the `ExtensionSource`
//! trait; this module only registers what a source yields and tracks the
//! per-source status.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{event, instrument, Level};

use crate::error::{MiseError, MiseResult};
use crate::ingredient::Ingredient;
use crate::registry::IngredientRegistry;
use crate::services::{LogNotifier, Notifier, Severity};

/// Produces the ingredient definitions published by an extension source.
#[async_trait]
pub trait ExtensionSource: Send + Sync {
  async fn fetch(&self, source: &str) -> anyhow::Result<Vec<Ingredient>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
  Loading,
  Loaded,
  /// Some definitions were rejected; the valid ones are registered.
  Partial,
  Error,
}

pub struct ExtensionLoader {
  registry: Arc<IngredientRegistry>,
  fetcher: Arc<dyn ExtensionSource>,
  notifier: Arc<dyn Notifier>,
  statuses: RwLock<HashMap<String, ExtensionStatus>>,
}

impl ExtensionLoader {
  pub fn new(registry: Arc<IngredientRegistry>, fetcher: Arc<dyn ExtensionSource>) -> Self {
    Self::with_notifier(registry, fetcher, Arc::new(LogNotifier))
  }

  pub fn with_notifier(
    registry: Arc<IngredientRegistry>,
    fetcher: Arc<dyn ExtensionSource>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self {
      registry,
      fetcher,
      notifier,
      statuses: RwLock::new(HashMap::new()),
    }
  }

  /// Fetches and registers the definitions of `source`, all inside one
  /// registry batch. Returns the final status; a fetch failure is returned as
  /// `MiseError::Extension` after the status is set to `Error`.
  #[instrument(name = "ExtensionLoader::load", skip_all, fields(source = %source))]
  pub async fn load(&self, source: &str) -> MiseResult<ExtensionStatus> {
    self.set_status(source, ExtensionStatus::Loading);

    let definitions = match self.fetcher.fetch(source).await {
      Ok(definitions) => definitions,
      Err(e) => {
        event!(Level::ERROR, error = %e, "Extension fetch failed.");
        self.set_status(source, ExtensionStatus::Error);
        self.notifier.show(
          &format!("Failed to load extension '{}': {}", source, e),
          Severity::Error,
          Some("Extensions"),
          None,
        );
        return Err(MiseError::Extension {
          source_id: source.to_string(),
          source: e,
        });
      }
    };

    let offered = definitions.len();
    let mut seen = HashSet::new();
    let mut rejected = Vec::new();

    self.registry.start_batch();
    for ingredient in definitions {
      if ingredient.id.trim().is_empty() {
        event!(Level::WARN, name = %ingredient.name, "Rejecting extension ingredient without an id.");
        rejected.push(ingredient.display_name().to_string());
        continue;
      }
      if !seen.insert(ingredient.id.clone()) {
        event!(Level::WARN, ingredient_id = %ingredient.id, "Rejecting duplicate ingredient id within one extension.");
        rejected.push(ingredient.id.clone());
        continue;
      }
      self.registry.register_owned(ingredient, source);
    }
    self.registry.end_batch();

    let status = if rejected.is_empty() {
      ExtensionStatus::Loaded
    } else if rejected.len() == offered {
      ExtensionStatus::Error
    } else {
      ExtensionStatus::Partial
    };

    if !rejected.is_empty() {
      let severity = if status == ExtensionStatus::Error {
        Severity::Error
      } else {
        Severity::Warning
      };
      self.notifier.show(
        &format!(
          "Extension '{}': {} of {} ingredients rejected",
          source,
          rejected.len(),
          offered
        ),
        severity,
        Some("Extensions"),
        None,
      );
    }

    event!(Level::INFO, registered = offered - rejected.len(), rejected = rejected.len(), status = ?status, "Extension processed.");
    self.set_status(source, status);
    Ok(status)
  }

  pub fn status(&self, source: &str) -> Option<ExtensionStatus> {
    self.statuses.read().get(source).copied()
  }

  /// Unregisters everything `source` registered and forgets its status.
  pub fn remove(&self, source: &str) -> usize {
    let removed = self.registry.unregister_extension(source);
    self.statuses.write().remove(source);
    event!(Level::INFO, %source, removed, "Extension removed.");
    removed
  }

  fn set_status(&self, source: &str, status: ExtensionStatus) {
    self.statuses.write().insert(source.to_string(), status);
  }
}

impl std::fmt::Debug for ExtensionLoader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExtensionLoader")
      .field("statuses", &*self.statuses.read())
      .finish()
  }
}
