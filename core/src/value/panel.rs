// mise/src/value/panel.rs

//! Instructions a step can hand back to change how the input or output
//! surface around the recipe is rendered. Pure data, no I/O.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelTarget {
  Input,
  Output,
}

/// A plain editable text surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPanel {
  pub title: Option<String>,
  pub placeholder: Option<String>,
  pub disabled: bool,
  pub show_clear: bool,
}

impl TextPanel {
  pub fn titled(title: impl Into<String>) -> Self {
    Self {
      title: Some(title.into()),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PanelMode {
  Text(TextPanel),
  /// Shows the spice editor of the given recipe step in place of the surface.
  Spices { instance_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelInstruction {
  pub target: PanelTarget,
  /// Recipe step instance that produced the instruction. Filled in by the kitchen.
  pub source: Option<String>,
  pub mode: PanelMode,
}

impl PanelInstruction {
  pub fn text(target: PanelTarget, panel: TextPanel) -> Self {
    Self {
      target,
      source: None,
      mode: PanelMode::Text(panel),
    }
  }

  pub fn spices(target: PanelTarget, instance_id: impl Into<String>) -> Self {
    Self {
      target,
      source: None,
      mode: PanelMode::Spices {
        instance_id: instance_id.into(),
      },
    }
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  pub fn is_spice_editor(&self) -> bool {
    matches!(self.mode, PanelMode::Spices { .. })
  }
}
