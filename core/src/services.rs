// mise/src/services.rs

//! Contracts for the collaborators the kitchen calls into: key-value
//! persistence and user notifications.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{event, Level};

/// Synchronous key-value persistence. Operations report failure through their
/// return value and never panic.
pub trait Storage: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: &str) -> bool;
  fn remove(&self, key: &str) -> bool;
}

/// In-process `Storage`, mostly useful for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Storage for MemoryStorage {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.read().get(key).cloned()
  }

  fn set(&self, key: &str, value: &str) -> bool {
    self.entries.write().insert(key.to_string(), value.to_string());
    true
  }

  fn remove(&self, key: &str) -> bool {
    self.entries.write().remove(key).is_some()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Info,
  Success,
  Warning,
  Error,
}

/// Fire-and-forget user notifications. Implementations are expected to
/// collapse identical notifications that are still on screen.
pub trait Notifier: Send + Sync {
  fn show(&self, message: &str, severity: Severity, title: Option<&str>, duration: Option<Duration>);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn show(&self, message: &str, severity: Severity, title: Option<&str>, _duration: Option<Duration>) {
    let title = title.unwrap_or_default();
    match severity {
      Severity::Info | Severity::Success => event!(Level::INFO, %title, "{}", message),
      Severity::Warning => event!(Level::WARN, %title, "{}", message),
      Severity::Error => event!(Level::ERROR, %title, "{}", message),
    }
  }
}
