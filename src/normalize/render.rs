//! Canonical rendering of a normalized response.

use super::{Confidence, NormalizedResponse};
use crate::config::SectionLabels;
use serde::Serialize;
use tracing::warn;

/// Machine-readable block body. Field order is the emitted key order.
#[derive(Serialize)]
struct MachineBlock<'a> {
    summary: &'a str,
    findings: &'a [String],
    recommendations: &'a [String],
    #[serde(skip_serializing_if = "no_mentions")]
    mentions: &'a [String],
    confidence: Confidence,
}

fn no_mentions(mentions: &&[String]) -> bool {
    mentions.is_empty()
}

/// Render `response` in canonical section order.
///
/// ````text
/// [Agent: reviewer_a]
///
/// ## Summary
/// One line.
///
/// ## Key Findings
/// - finding
///
/// ## Recommended Actions
/// - [ ] action
///
/// ## Structured (YAML)
/// ```yaml
/// summary: One line.
/// ...
/// ```
/// ````
pub fn render(response: &NormalizedResponse, labels: &SectionLabels) -> String {
    let mut lines: Vec<String> = vec![
        format!("[Agent: {}]", response.agent_name),
        String::new(),
        labels.summary.clone(),
        response.summary.clone(),
        String::new(),
        labels.findings.clone(),
    ];
    lines.extend(response.findings.iter().map(|item| format!("- {}", item)));
    lines.push(String::new());
    lines.push(labels.actions.clone());
    lines.extend(response.actions.iter().map(|item| format!("- [ ] {}", item)));
    lines.push(String::new());
    lines.push(labels.structured.clone());
    lines.push("```yaml".to_string());
    lines.push(machine_block(response).trim_end().to_string());
    lines.push("```".to_string());

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn machine_block(response: &NormalizedResponse) -> String {
    let block = MachineBlock {
        summary: &response.summary,
        findings: &response.findings,
        recommendations: &response.actions,
        mentions: &response.mentions,
        confidence: response.confidence,
    };
    match serde_yaml::to_string(&block) {
        Ok(yaml) => yaml,
        Err(e) => {
            warn!(agent = %response.agent_name, error = %e, "failed to serialize machine block");
            format!("confidence: {}\n", response.confidence.as_str())
        }
    }
}
