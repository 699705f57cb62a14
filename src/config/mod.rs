//! Configuration model for parley.
//!
//! This module defines the Config struct that represents `.parley/config.yaml`.
//! Parsing is forward-compatible (unknown fields are ignored) and every field
//! has a built-in default, so a partial file overrides only what it names.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{FormatFlags, FormatLimits, FormatRules, SectionLabels, TriggerConfig};
