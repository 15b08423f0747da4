// src/lib.rs

//! Mise: a reactive recipe engine for Rust.
//!
//! A recipe is an ordered list of ingredient steps. Each step receives the
//! previous step's output as a typed value, transforms it, and hands it on.
//! Mise provides:
//!  - `InputType`, a typed value with well-defined casting and fallbacks.
//!  - Spices (per-step parameters) with sanitizing validation and visibility
//!    rules between them.
//!  - An `IngredientRegistry` with batched change notifications.
//!  - A `Kitchen` that cooks the recipe single-flight whenever its input or
//!    definition changes, with optional interval re-cooking.
//!  - Recipe documents, extension loading and a small pantry of built-ins.

pub mod config;
pub mod error;
pub mod extension;
pub mod ingredient;
pub mod kitchen;
pub mod pantry;
pub mod recipe;
pub mod registry;
pub mod services;
pub mod spice;
pub mod value;

// --- Re-exports for the Public API ---

pub use crate::value::{CastOptions, InputType, PanelInstruction, PanelMode, PanelTarget, Payload, TextPanel, ValueKind};

pub use crate::spice::{SelectOption, Spice, SpiceDependency, SpiceKind, SpiceValue, Spices};

pub use crate::ingredient::{CookContext, Ingredient, IngredientFn, IngredientFuture, Serving};

pub use crate::registry::{IngredientRegistry, ListenerId, RegistryChange};

pub use crate::recipe::{ImportedRecipe, RecipeDocument, RecipeStep};

pub use crate::kitchen::{CookResult, CookStatus, Kitchen, KitchenSubscription};

pub use crate::services::{LogNotifier, MemoryStorage, Notifier, Severity, Storage};

pub use crate::extension::{ExtensionLoader, ExtensionSource, ExtensionStatus};

pub use crate::config::KitchenConfig;

pub use crate::error::{CastError, MiseError, MiseResult};

/*
    Core Workflow:
    1. Create an `IngredientRegistry` and register ingredients (or the pantry
       via `pantry::register_all`).
    2. Create a `Kitchen` with the registry and a `KitchenConfig`.
    3. Call `kitchen.install_subscription()` to cook on every change, or call
       `kitchen.cook().await` directly.
    4. Mutate input and recipe through the kitchen (`set_input_data`,
       `add_step`, `set_spice`, ...) and read `kitchen.result()` or watch
       `kitchen.subscribe_results()`.
*/
