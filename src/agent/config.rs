//! Agent roster configuration for parley.
//!
//! This module defines the `agents.yaml` file format, which names the agents
//! that take part in a discussion and how each one is invoked.
//!
//! # File Format
//!
//! ```yaml
//! agents:
//!   moderator:
//!     description: "Triage and moderation"
//!     trigger_conditions:
//!       - "new issue without triage"
//!   reviewer_a:
//!     description: "Supporting reviewer"
//!     timeout_seconds: 900
//!   local_llm:
//!     description: "Local model"
//!     command: "./scripts/ask.sh --persona {agent}"
//!     output: text
//!     environment:
//!       MODEL: "qwen"
//!
//! defaults:
//!   command: "claude --print --output-format stream-json --verbose"
//!   output: stream-json
//!   timeout_seconds: 600
//!
//! prompt_template: |
//!   Work on GitHub Issue #{issue_number}:
//!
//!   {context}
//!
//!   Prefix your reply with [Agent: {agent_name}].
//! ```
//!
//! # Placeholders
//!
//! Command templates support `{agent}`. The prompt template supports
//! `{issue_number}`, `{context}` and `{agent_name}`. The prompt itself is
//! written to the command's standard input.

use super::template::{TemplateError, render_template, vars};
use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

/// Default timeout for one agent invocation in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Default agent command.
const DEFAULT_COMMAND: &str = "claude --print --output-format stream-json --verbose";

/// Prompt shared by every agent unless `prompt_template` overrides it.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Please carry out the following task for GitHub Issue #{issue_number}:

{context}

Prefix your reply with [Agent: {agent_name}].";

/// How an agent command prints its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Standard output is the answer.
    Text,
    /// One JSON event per line; the answer is the text of `assistant` messages.
    #[default]
    StreamJson,
}

/// Configuration for all agents, loaded from `agents.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Agent profiles keyed by name.
    pub agents: BTreeMap<String, AgentProfile>,

    /// Settings for agents that do not override them.
    pub defaults: AgentDefaults,

    /// Prompt template rendered for every agent.
    pub prompt_template: String,
}

/// Default settings for agent execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Command template.
    pub command: String,

    /// Output format of the command.
    pub output: OutputFormat,

    /// Timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            output: OutputFormat::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// Profile for a single agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// One-line description shown by `list-agents`.
    #[serde(default)]
    pub description: String,

    /// Command template (overrides the default if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Output format (overrides the default if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,

    /// Timeout in seconds (overrides the default if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Environment variables set for the agent process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    /// When the observer should wake this agent, in plain words.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_conditions: Vec<String>,
}

/// Effective settings for one agent after applying defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAgent {
    pub name: String,
    pub command: String,
    pub output: OutputFormat,
    pub timeout: Duration,
    pub environment: HashMap<String, String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        let roster = [
            (
                "moderator",
                "Triage and moderation",
                &["new issue without triage", "discussion has lost direction"][..],
            ),
            (
                "reviewer_a",
                "Supporting reviewer",
                &["paper or proposal awaiting review"][..],
            ),
            (
                "reviewer_b",
                "Critical reviewer",
                &["claims need a critical check"][..],
            ),
            (
                "summarizer",
                "Consensus summary; may close the issue",
                &["long discussion without a summary", "reviewers have converged"][..],
            ),
        ];
        Self {
            agents: roster
                .into_iter()
                .map(|(name, description, conditions)| {
                    (
                        name.to_string(),
                        AgentProfile {
                            description: description.to_string(),
                            trigger_conditions: conditions.iter().map(|c| c.to_string()).collect(),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            defaults: AgentDefaults::default(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl AgentsConfig {
    /// Load agents config from a YAML file, using the built-in roster when the
    /// file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no agents file, using built-in roster");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ParleyError::ConfigError(format!(
                "failed to read agents config '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse agents config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AgentsConfig = serde_yaml::from_str(yaml).map_err(|e| {
            ParleyError::ConfigError(format!("failed to parse agents.yaml: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the agents configuration.
    ///
    /// Validation rules:
    /// - Agent names must be valid mention names, written lowercase
    /// - Commands must not be empty
    /// - Timeouts must be positive
    /// - The prompt template must render with the known placeholders
    pub fn validate(&self) -> Result<()> {
        if self.defaults.timeout_seconds == 0 {
            return Err(ParleyError::ConfigError(
                "agents.yaml: defaults.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.defaults.command.trim().is_empty() {
            return Err(ParleyError::ConfigError(
                "agents.yaml: defaults.command must not be empty".to_string(),
            ));
        }

        for (name, agent) in &self.agents {
            if crate::mention::normalize_mention(name).as_deref() != Some(name.as_str()) {
                return Err(ParleyError::ConfigError(format!(
                    "agents.yaml: agent name '{}' must be lowercase letters, digits, '_' or '-'",
                    name
                )));
            }

            if let Some(command) = &agent.command
                && command.trim().is_empty()
            {
                return Err(ParleyError::ConfigError(format!(
                    "agents.yaml: agent '{}' has empty command",
                    name
                )));
            }

            if agent.timeout_seconds == Some(0) {
                return Err(ParleyError::ConfigError(format!(
                    "agents.yaml: agent '{}' has timeout_seconds of 0",
                    name
                )));
            }
        }

        self.render_prompt(0, "", "probe").map_err(|e| {
            ParleyError::ConfigError(format!("agents.yaml: prompt_template: {}", e))
        })?;

        Ok(())
    }

    /// Effective settings for `name`. Agents outside the roster run with the defaults.
    pub fn resolve(&self, name: &str) -> ResolvedAgent {
        let profile = self.agents.get(name);
        ResolvedAgent {
            name: name.to_string(),
            command: profile
                .and_then(|p| p.command.clone())
                .unwrap_or_else(|| self.defaults.command.clone()),
            output: profile
                .and_then(|p| p.output)
                .unwrap_or(self.defaults.output),
            timeout: Duration::from_secs(
                profile
                    .and_then(|p| p.timeout_seconds)
                    .unwrap_or(self.defaults.timeout_seconds),
            ),
            environment: profile.map(|p| p.environment.clone()).unwrap_or_default(),
        }
    }

    /// Render the prompt template for one agent.
    pub fn render_prompt(
        &self,
        issue_number: u64,
        context: &str,
        agent_name: &str,
    ) -> std::result::Result<String, TemplateError> {
        render_template(
            &self.prompt_template,
            &vars([
                ("issue_number", issue_number.to_string()),
                ("context", context.to_string()),
                ("agent_name", agent_name.to_string()),
            ]),
        )
    }

    /// Iterate over the roster in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AgentProfile)> {
        self.agents.iter().map(|(name, a)| (name.as_str(), a))
    }
}
