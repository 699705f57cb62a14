//! Configuration types and defaults for parley.
//!
//! `FormatRules` drives the response normalizer; `TriggerConfig` names the
//! workflow used to wake mentioned agents.

use serde::{Deserialize, Serialize};

/// Response format rules applied by the normalizer.
///
/// ```yaml
/// format:
///   force_normalize: false
///   sections:
///     summary: "## Summary"
///   limits:
///     findings_count: 3
///   rules:
///     mentions_only_in_actions: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatRules {
    /// Normalize even when the response carries no section markers.
    pub force_normalize: bool,

    /// Literal section header labels.
    pub sections: SectionLabels,

    /// Character and bullet limits.
    pub limits: FormatLimits,

    /// Behavioral flags.
    pub rules: FormatFlags,
}

/// Section header labels, matched literally at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionLabels {
    pub summary: String,
    pub findings: String,
    pub actions: String,
    pub structured: String,
}

impl Default for SectionLabels {
    fn default() -> Self {
        Self {
            summary: "## Summary".to_string(),
            findings: "## Key Findings".to_string(),
            actions: "## Recommended Actions".to_string(),
            structured: "## Structured (YAML)".to_string(),
        }
    }
}

impl SectionLabels {
    /// Labels in canonical section order.
    pub fn in_order(&self) -> [&str; 4] {
        [
            self.summary.as_str(),
            self.findings.as_str(),
            self.actions.as_str(),
            self.structured.as_str(),
        ]
    }
}

/// Numeric limits for normalized sections. Character limits count chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatLimits {
    pub summary_max_chars: usize,
    /// Findings kept, and the minimum expected before a warning is raised.
    pub findings_count: usize,
    pub findings_max_chars: usize,
    pub actions_max_count: usize,
    pub actions_max_chars: usize,
}

impl Default for FormatLimits {
    fn default() -> Self {
        Self {
            summary_max_chars: 160,
            findings_count: 3,
            findings_max_chars: 200,
            actions_max_count: 2,
            actions_max_chars: 200,
        }
    }
}

/// Behavioral flags for normalization and mention harvesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatFlags {
    /// Only inline mentions inside action items become canonical mentions.
    pub mentions_only_in_actions: bool,

    /// Warn when the structured block is missing.
    pub yaml_required: bool,
}

impl Default for FormatFlags {
    fn default() -> Self {
        Self {
            mentions_only_in_actions: true,
            yaml_required: true,
        }
    }
}

/// Settings for waking mentioned agents through a workflow dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Workflow file (or name) passed to `gh workflow run`.
    pub workflow: String,

    /// Git ref the workflow runs on; the repository default when unset.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            workflow: default_trigger_workflow(),
            git_ref: None,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_trigger_workflow() -> String {
    "agent.yml".to_string()
}
pub(crate) fn default_comment_max_chars() -> usize {
    10_000
}
pub(crate) fn default_cascade_max_depth() -> usize {
    4
}
