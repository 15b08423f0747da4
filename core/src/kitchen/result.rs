// mise/src/kitchen/result.rs

//! Outcome of one cook.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::PanelInstruction;

/// Status of a whole cook, or of a single recipe step within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookStatus {
  #[default]
  Idle,
  Success,
  Warning,
  Error,
}

/// Aggregate result of one cook. Each completed cook publishes a fresh
/// `CookResult` that replaces the previous one entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookResult {
  /// String projection of the last good (or error-describing) value.
  pub output: String,
  pub status: CookStatus,
  /// Keyed by recipe step instance id. Steps after a halt have no entry.
  pub step_statuses: BTreeMap<String, CookStatus>,
  pub step_warnings: BTreeMap<String, String>,
  pub input_panel: Option<PanelInstruction>,
  pub output_panel: Option<PanelInstruction>,
  /// Step instance that supplied the current spice-editor input panel.
  pub spice_panel_source: Option<String>,
}

impl CookResult {
  pub fn status_of(&self, instance_id: &str) -> Option<CookStatus> {
    self.step_statuses.get(instance_id).copied()
  }

  pub fn warning_of(&self, instance_id: &str) -> Option<&str> {
    self.step_warnings.get(instance_id).map(String::as_str)
  }
}
