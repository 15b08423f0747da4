// tests/registry_tests.rs
mod common;

use common::*;
use mise::{Ingredient, IngredientRegistry, InputType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_listener(registry: &IngredientRegistry) -> Arc<AtomicUsize> {
  let notifications = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&notifications);
  registry.subscribe(move |_change| {
    counter.fetch_add(1, Ordering::SeqCst);
  });
  notifications
}

fn identity(id: &str, name: &str) -> Ingredient {
  Ingredient::new_sync(id.to_string(), name.to_string(), |input: InputType, _spices| Ok(input.into()))
}

#[test]
fn test_register_and_lookup() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  registry.register(uppercase());

  assert!(registry.contains("uppercase"));
  assert_eq!(registry.get("uppercase").unwrap().name, "Uppercase");
  assert_eq!(registry.id_for_name("Uppercase").as_deref(), Some("uppercase"));
  assert_eq!(registry.name_for_id("uppercase").as_deref(), Some("Uppercase"));
  assert!(registry.get("missing").is_none());
}

#[test]
fn test_each_mutation_notifies_once() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  let notifications = counting_listener(&registry);

  registry.register(identity("a", "A"));
  registry.register(identity("b", "B"));
  assert_eq!(notifications.load(Ordering::SeqCst), 2);

  assert_eq!(registry.unregister(&["a", "unknown"]), 1);
  assert_eq!(notifications.load(Ordering::SeqCst), 3);

  // Nothing removed, nothing to report.
  assert_eq!(registry.unregister(&["unknown"]), 0);
  assert_eq!(notifications.load(Ordering::SeqCst), 3);
  assert_eq!(registry.version(), 3);
}

#[test]
fn test_batch_raises_a_single_notification() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  let notifications = counting_listener(&registry);

  registry.start_batch();
  for i in 0..10 {
    registry.register(identity(&format!("step_{i}"), &format!("Step {i}")));
  }
  assert_eq!(notifications.load(Ordering::SeqCst), 0);
  registry.end_batch();

  assert_eq!(notifications.load(Ordering::SeqCst), 1);
  assert_eq!(registry.len(), 10);
}

#[test]
fn test_empty_batch_is_silent_and_batches_do_not_nest() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  let notifications = counting_listener(&registry);

  registry.start_batch();
  registry.end_batch();
  assert_eq!(notifications.load(Ordering::SeqCst), 0);

  registry.start_batch();
  registry.start_batch();
  registry.register(identity("a", "A"));
  registry.end_batch();
  assert!(!registry.is_batching());
  assert_eq!(notifications.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reregistration_overwrites_and_remaps_name() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  registry.register(identity("a", "Old Name"));
  registry.register(identity("a", "New Name"));

  assert_eq!(registry.len(), 1);
  assert_eq!(registry.id_for_name("New Name").as_deref(), Some("a"));
  assert!(registry.id_for_name("Old Name").is_none());
}

#[test]
fn test_missing_name_is_accepted() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  registry.register(identity("anonymous", ""));

  assert!(registry.contains("anonymous"));
  assert!(registry.name_for_id("anonymous").is_none());
  assert_eq!(registry.get("anonymous").unwrap().display_name(), "anonymous");
}

#[test]
fn test_blank_name_is_not_mapped() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  registry.register(identity("blank", "   "));

  assert!(registry.contains("blank"));
  assert!(registry.id_for_name("   ").is_none());
  assert!(registry.name_for_id("blank").is_none());
  assert_eq!(registry.get("blank").unwrap().display_name(), "blank");
}

#[test]
fn test_get_all_keeps_registration_order() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  for id in ["c", "a", "b"] {
    registry.register(identity(id, id));
  }
  registry.unregister(&["a"]);

  let ids: Vec<String> = registry.get_all().iter().map(|i| i.id.clone()).collect();
  assert_eq!(ids, vec!["c", "b"]);
}

#[test]
fn test_unregister_extension_removes_owned_ingredients() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  registry.register(uppercase());
  registry.register_owned(identity("ext_a", "Ext A"), "remote");
  registry.register_owned(identity("ext_b", "Ext B"), "remote");
  let notifications = counting_listener(&registry);

  assert_eq!(registry.unregister_extension("remote"), 2);
  assert_eq!(notifications.load(Ordering::SeqCst), 1);
  assert_eq!(registry.len(), 1);
  assert_eq!(registry.get("uppercase").unwrap().extension, None);
}

#[test]
fn test_unsubscribed_listener_is_not_called() {
  setup_tracing();
  let registry = IngredientRegistry::new();
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let id = registry.subscribe(move |change| {
    assert!(change.size > 0);
    counter.fetch_add(1, Ordering::SeqCst);
  });

  registry.register(identity("a", "A"));
  registry.unsubscribe(id);
  registry.register(identity("b", "B"));

  assert_eq!(calls.load(Ordering::SeqCst), 1);
}
