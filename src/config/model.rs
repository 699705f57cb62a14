//! Config struct definition and default implementation.

use super::types::*;
use crate::mention::MentionPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for a parley workspace.
///
/// This struct represents the contents of `.parley/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Tracker settings
    // =========================================================================
    /// Repository slug (`owner/repo`) passed to `gh --repo`; the current
    /// checkout's repository when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Maximum length of a comment body posted to the tracker.
    #[serde(default = "default_comment_max_chars")]
    pub comment_max_chars: usize,

    // =========================================================================
    // Response pipeline
    // =========================================================================
    /// Normalizer format rules.
    pub format: FormatRules,

    /// Mention trust policy.
    pub mentions: MentionPolicy,

    // =========================================================================
    // Dispatch
    // =========================================================================
    /// Longest agent-to-agent chain allowed before dispatch stops.
    #[serde(default = "default_cascade_max_depth")]
    pub cascade_max_depth: usize,

    /// Workflow dispatch settings.
    pub trigger: TriggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository: None,
            comment_max_chars: default_comment_max_chars(),
            format: FormatRules::default(),
            mentions: MentionPolicy::default(),
            cascade_max_depth: default_cascade_max_depth(),
            trigger: TriggerConfig::default(),
        }
    }
}
