//! Response normalization.
//!
//! Agents are asked to answer in four sections (summary, key findings,
//! recommended actions, and a fenced YAML block). What comes back is only
//! loosely shaped like that. [`normalize`] re-parses the text and, when the
//! sections are there, re-emits it in canonical form with every limit applied.
//!
//! # Modes
//!
//! - **Passthrough**: no section marker at all and `force_normalize` off. The
//!   text is returned untouched with no warnings.
//! - **Partial**: some but not all markers and `force_normalize` off. The text
//!   is returned untouched with a `Missing sections: …` warning.
//! - **Structured**: every marker present, or `force_normalize` on. Sections
//!   are extracted, clipped and rendered by [`render`].
//!
//! Rendering output and normalizing it again yields the same summary,
//! findings, actions, mentions and confidence.

mod render;


pub use render::render;

use crate::config::FormatRules;
use crate::mention::{clean_mentions_in_text, inline_mentions, mentions_from_yaml};
use crate::scan::{self, Marker};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Summary placeholder used when the summary section has no text.
pub const MISSING_SUMMARY: &str = "(missing)";

/// Self-reported confidence of an agent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    /// Parse a confidence level (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// A response after structural normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedResponse {
    pub agent_name: String,
    /// One line, mentions cleaned; [`MISSING_SUMMARY`] when the section was empty.
    pub summary: String,
    /// Mentions cleaned.
    pub findings: Vec<String>,
    /// Mentions kept: actions are where agents ask each other for help.
    pub actions: Vec<String>,
    /// Canonical mention list re-emitted in the machine block.
    pub mentions: Vec<String>,
    pub confidence: Confidence,
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// The input, unchanged.
    Passthrough(String),
    /// Parsed sections and their canonical rendering.
    Structured {
        response: NormalizedResponse,
        text: String,
    },
}

impl Normalization {
    /// Text to publish.
    pub fn text(&self) -> &str {
        match self {
            Normalization::Passthrough(text) => text,
            Normalization::Structured { text, .. } => text,
        }
    }

    /// Parsed sections, when the response was normalized structurally.
    pub fn response(&self) -> Option<&NormalizedResponse> {
        match self {
            Normalization::Passthrough(_) => None,
            Normalization::Structured { response, .. } => Some(response),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Normalization::Passthrough(text) => text,
            Normalization::Structured { text, .. } => text,
        }
    }
}

/// Normalize raw agent output against `rules`.
///
/// # Arguments
///
/// * `raw` - Agent output as received
/// * `agent_name` - Emitting agent, written into the `[Agent: …]` header
/// * `rules` - Section labels, limits and flags
///
/// # Returns
///
/// The normalization and the warnings raised along the way. Malformed input
/// never fails; problems surface as warnings and content is kept where it can be.
pub fn normalize(raw: &str, agent_name: &str, rules: &FormatRules) -> (Normalization, Vec<String>) {
    let labels = rules.sections.in_order();
    let markers = scan::find_markers(raw, &labels);
    let missing: Vec<&str> = labels
        .iter()
        .zip(&markers)
        .filter(|(_, marker)| marker.is_none())
        .map(|(label, _)| *label)
        .collect();

    // Without a summary marker the text is free-form, whatever else it holds.
    if !rules.force_normalize && markers[0].is_none() {
        return (Normalization::Passthrough(raw.to_string()), Vec::new());
    }

    let mut warnings = Vec::new();
    if !missing.is_empty() {
        warnings.push(format!("Missing sections: {}", missing.join(", ")));
        if !rules.force_normalize {
            debug!(agent = agent_name, missing = ?missing, "partial sections, passing through");
            return (Normalization::Passthrough(raw.to_string()), warnings);
        }
    }

    let blocks = section_blocks(raw, &markers);
    let limits = &rules.limits;

    // Summary
    let raw_summary = blocks[0]
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let mut summary = clip(
        &clean_mentions_in_text(raw_summary),
        limits.summary_max_chars,
    );
    if summary.is_empty() {
        warnings.push("Summary is empty".to_string());
        summary = MISSING_SUMMARY.to_string();
    }

    // Key findings
    let finding_bullets = bullets(blocks[1]);
    if finding_bullets.is_empty() {
        warnings.push("Key Findings missing bullets".to_string());
    }
    let kept_findings: Vec<&str> = finding_bullets
        .into_iter()
        .take(limits.findings_count)
        .collect();
    let findings: Vec<String> = kept_findings
        .iter()
        .map(|item| clip(&clean_mentions_in_text(item), limits.findings_max_chars))
        .collect();
    if findings.len() < limits.findings_count {
        warnings.push(format!(
            "Key Findings fewer than {} bullets",
            limits.findings_count
        ));
    }

    // Recommended actions
    let action_bullets: Vec<&str> = bullets(blocks[2])
        .into_iter()
        .map(strip_checkbox)
        .filter(|item| !item.is_empty())
        .collect();
    if action_bullets.is_empty() {
        warnings.push("Recommended Actions missing bullets".to_string());
    }
    if action_bullets.len() > limits.actions_max_count {
        warnings.push(format!(
            "Recommended Actions truncated to {} bullets",
            limits.actions_max_count
        ));
    }
    let actions: Vec<String> = action_bullets
        .iter()
        .take(limits.actions_max_count)
        .map(|item| clip(item, limits.actions_max_chars))
        .collect();

    // Structured block
    let mut mentions = Vec::new();
    let confidence = match scan::first_yaml_block(blocks[3]) {
        None => {
            if rules.rules.yaml_required {
                warnings.push("Structured block missing".to_string());
            }
            Confidence::default()
        }
        Some(block) => match serde_yaml::from_str::<serde_yaml::Value>(block.body) {
            Ok(value) => {
                mentions.extend(mentions_from_yaml(block.body));
                value
                    .get("confidence")
                    .and_then(|c| c.as_str())
                    .and_then(Confidence::parse)
                    .unwrap_or_default()
            }
            Err(e) => {
                debug!(agent = agent_name, error = %e, "structured block did not parse");
                warnings.push("Structured block is not valid YAML".to_string());
                Confidence::default()
            }
        },
    };

    if !rules.rules.mentions_only_in_actions {
        mentions.extend(inline_mentions(raw_summary));
        for item in &kept_findings {
            mentions.extend(inline_mentions(item));
        }
    }
    for item in &actions {
        mentions.extend(inline_mentions(item));
    }
    let mut seen = HashSet::new();
    mentions.retain(|name| seen.insert(name.clone()));

    let response = NormalizedResponse {
        agent_name: agent_name.to_string(),
        summary,
        findings,
        actions,
        mentions,
        confidence,
    };
    let text = render(&response, &rules.sections);

    debug!(
        agent = agent_name,
        warnings = warnings.len(),
        mentions = response.mentions.len(),
        "response normalized"
    );

    (Normalization::Structured { response, text }, warnings)
}

/// Raw text of each section, in marker order. A missing section is empty.
///
/// A section runs from the end of its marker label to the start of the next
/// marker line by position, or to the end of the text.
fn section_blocks<'a>(text: &'a str, markers: &[Option<Marker>]) -> Vec<&'a str> {
    markers
        .iter()
        .map(|marker| {
            let Some(marker) = marker else {
                return "";
            };
            let end = markers
                .iter()
                .flatten()
                .map(|other| other.line_start)
                .filter(|&start| start > marker.line_start)
                .min()
                .unwrap_or(text.len());
            &text[marker.body_start..end.max(marker.body_start)]
        })
        .collect()
}

fn bullets(block: &str) -> Vec<&str> {
    block.lines().filter_map(scan::bullet_content).collect()
}

fn strip_checkbox(item: &str) -> &str {
    ["[ ]", "[x]", "[X]"]
        .iter()
        .find_map(|checkbox| item.strip_prefix(checkbox))
        .map(str::trim_start)
        .unwrap_or(item)
}

/// Collapse whitespace, hard-cut to `limit` chars, then trim the tail.
fn clip(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut: String = collapsed.chars().take(limit).collect();
    cut.trim_end().to_string()
}
