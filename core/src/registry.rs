// mise/src/registry.rs

//! Defines `IngredientRegistry`, the table mapping ingredient ids to their
//! definitions. It is the single source of truth for whether an ingredient
//! exists; the kitchen and spice validation always read its current contents.
//!
//! Every mutation raises one "registry changed" notification, unless a batch
//! is open, in which case a single notification is raised when it closes.

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{event, instrument, Level};

use crate::ingredient::Ingredient;

/// Payload of a "registry changed" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryChange {
  /// Incremented once per notification.
  pub version: u64,
  /// Number of registered ingredients after the change.
  pub size: usize,
}

pub type RegistryListener = Arc<dyn Fn(&RegistryChange) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct RegistryInner {
  ingredients: IndexMap<String, Arc<Ingredient>>,
  /// display name -> id
  ids_by_name: HashMap<String, String>,
  batching: bool,
  dirty: bool,
  version: u64,
}

impl RegistryInner {
  fn forget_name_of(&mut self, id: &str) {
    if let Some(previous) = self.ingredients.get(id) {
      if self.ids_by_name.get(&previous.name).is_some_and(|mapped| mapped == id) {
        self.ids_by_name.remove(&previous.name);
      }
    }
  }
}

pub struct IngredientRegistry {
  inner: RwLock<RegistryInner>,
  listeners: Mutex<Vec<(ListenerId, RegistryListener)>>,
  next_listener: AtomicU64,
}

impl IngredientRegistry {
  /// Creates a new, empty registry.
  pub fn new() -> Self {
    Self {
      inner: RwLock::new(RegistryInner::default()),
      listeners: Mutex::new(Vec::new()),
      next_listener: AtomicU64::new(1),
    }
  }

  /// Registers (or replaces) an ingredient under its id.
  pub fn register(&self, ingredient: Ingredient) {
    self.insert(ingredient);
  }

  /// Registers an ingredient on behalf of `owner` (an extension source).
  pub fn register_owned(&self, mut ingredient: Ingredient, owner: &str) {
    ingredient.extension = Some(owner.to_string());
    self.insert(ingredient);
  }

  #[instrument(name = "IngredientRegistry::register", skip_all, fields(ingredient_id = %ingredient.id))]
  fn insert(&self, ingredient: Ingredient) {
    let change = {
      let mut inner = self.inner.write();

      if ingredient.name.trim().is_empty() {
        event!(
          Level::WARN,
          "Ingredient registered without a display name; recipes using it cannot be exported stably."
        );
      }
      if inner.ingredients.contains_key(&ingredient.id) {
        event!(Level::WARN, "Ingredient already registered, overwriting.");
        inner.forget_name_of(&ingredient.id);
      }
      if !ingredient.name.trim().is_empty() {
        if let Some(other) = inner.ids_by_name.get(&ingredient.name) {
          if other != &ingredient.id {
            event!(Level::WARN, name = %ingredient.name, previous_id = %other, "Display name already mapped to another ingredient, remapping.");
          }
        }
        inner
          .ids_by_name
          .insert(ingredient.name.clone(), ingredient.id.clone());
      }

      inner.ingredients.insert(ingredient.id.clone(), Arc::new(ingredient));
      Self::mark_changed(&mut inner)
    };
    self.notify(change);
  }

  /// Removes the given ids. Unknown ids are ignored. Returns how many
  /// ingredients were removed.
  pub fn unregister<S: AsRef<str>>(&self, ids: &[S]) -> usize {
    let (removed, change) = {
      let mut inner = self.inner.write();
      let mut removed = 0;
      for id in ids {
        let id = id.as_ref();
        inner.forget_name_of(id);
        if inner.ingredients.shift_remove(id).is_some() {
          removed += 1;
        }
      }
      let change = if removed > 0 { Self::mark_changed(&mut inner) } else { None };
      (removed, change)
    };
    event!(Level::DEBUG, removed, "Unregistered ingredients.");
    self.notify(change);
    removed
  }

  /// Removes every ingredient registered by `owner`.
  pub fn unregister_extension(&self, owner: &str) -> usize {
    let ids: Vec<String> = self
      .inner
      .read()
      .ingredients
      .values()
      .filter(|ingredient| ingredient.extension.as_deref() == Some(owner))
      .map(|ingredient| ingredient.id.clone())
      .collect();
    self.unregister(&ids)
  }

  /// Suppresses notifications until `end_batch`. Batches do not nest.
  pub fn start_batch(&self) {
    let mut inner = self.inner.write();
    if inner.batching {
      event!(Level::DEBUG, "start_batch called while a batch is already open.");
    } else {
      inner.dirty = false;
    }
    inner.batching = true;
  }

  /// Closes the batch and raises one notification if anything changed.
  pub fn end_batch(&self) {
    let change = {
      let mut inner = self.inner.write();
      inner.batching = false;
      if inner.dirty {
        inner.dirty = false;
        Self::mark_changed(&mut inner)
      } else {
        None
      }
    };
    self.notify(change);
  }

  pub fn is_batching(&self) -> bool {
    self.inner.read().batching
  }

  pub fn get(&self, id: &str) -> Option<Arc<Ingredient>> {
    self.inner.read().ingredients.get(id).cloned()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.inner.read().ingredients.contains_key(id)
  }

  /// Snapshot of all ingredients in registration order.
  pub fn get_all(&self) -> Vec<Arc<Ingredient>> {
    self.inner.read().ingredients.values().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.inner.read().ingredients.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn id_for_name(&self, name: &str) -> Option<String> {
    self.inner.read().ids_by_name.get(name).cloned()
  }

  pub fn name_for_id(&self, id: &str) -> Option<String> {
    self
      .inner
      .read()
      .ingredients
      .get(id)
      .map(|ingredient| ingredient.name.clone())
      .filter(|name| !name.trim().is_empty())
  }

  /// Number of notifications raised so far.
  pub fn version(&self) -> u64 {
    self.inner.read().version
  }

  pub fn subscribe(&self, listener: impl Fn(&RegistryChange) + Send + Sync + 'static) -> ListenerId {
    let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
    self.listeners.lock().push((id, Arc::new(listener)));
    id
  }

  pub fn unsubscribe(&self, id: ListenerId) {
    self.listeners.lock().retain(|(listener_id, _)| *listener_id != id);
  }

  fn mark_changed(inner: &mut RegistryInner) -> Option<RegistryChange> {
    if inner.batching {
      inner.dirty = true;
      return None;
    }
    inner.version += 1;
    Some(RegistryChange {
      version: inner.version,
      size: inner.ingredients.len(),
    })
  }

  // Listeners run without any registry lock held, so they may read the registry.
  fn notify(&self, change: Option<RegistryChange>) {
    let Some(change) = change else {
      return;
    };
    let listeners: Vec<RegistryListener> = self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
    event!(Level::DEBUG, version = change.version, size = change.size, listeners = listeners.len(), "Registry changed.");
    for listener in listeners {
      listener(&change);
    }
  }
}

impl Default for IngredientRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for IngredientRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let inner = self.inner.read();
    f.debug_struct("IngredientRegistry")
      .field("ingredients", &inner.ingredients.keys().collect::<Vec<_>>())
      .field("batching", &inner.batching)
      .field("version", &inner.version)
      .finish()
  }
}
